//! Pearson correlation matrix over raw sample rows

use serde::Deserialize;

use super::{ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, ColorRamp, SequentialColor};
use crate::chart::{axis, format, legend, palette, stats, Anchor, ChartArea, Margin, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

/// Cells darker than this get white labels
const DARK_CELL: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorrelationHeatmap {
    pub variables: Vec<String>,
}

impl CorrelationHeatmap {
    /// Row-major matrix; each pair uses the rows where both are numbers
    fn matrix(&self, records: &[ResultRecord]) -> Vec<Vec<f64>> {
        let n = self.variables.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let (a, b) = (&self.variables[i], &self.variables[j]);
                let (xs, ys): (Vec<f64>, Vec<f64>) = records
                    .iter()
                    .filter_map(|r| Some((r.number(a)?, r.number(b)?)))
                    .unzip();
                let r = stats::pearson(&xs, &ys);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }
        matrix
    }
}

impl ChartRenderer for CorrelationHeatmap {
    fn required_columns(&self) -> Vec<&str> {
        self.variables.iter().map(String::as_str).collect()
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        if self.variables.is_empty() {
            return Ok(());
        }
        let has_numbers = records
            .iter()
            .any(|r| self.variables.iter().any(|v| r.number(v).is_some()));
        if !has_numbers {
            return Ok(());
        }

        let frame = area.frame().with_margin(Margin {
            left: 110.0,
            bottom: 90.0,
            ..Margin::default()
        });
        let side = frame.inner_width().min(frame.inner_height());
        let left = frame.margin.left;
        let top = frame.margin.top;
        let x = BandScale::new(self.variables.clone(), (left, left + side)).padding(0.02);
        let y = BandScale::new(self.variables.clone(), (top, top + side)).padding(0.02);
        let colors = SequentialColor::new((-1.0, 1.0), ColorRamp::new(palette::DIVERGING));

        area.extend(axis::band(&x, axis::Orient::Bottom, top + side, (left, left + side)));
        area.extend(axis::band(&y, axis::Orient::Left, left, (top, top + side)));

        let matrix = self.matrix(records);
        for (i, row_var) in self.variables.iter().enumerate() {
            for (j, col_var) in self.variables.iter().enumerate() {
                let (Some(cx), Some(cy)) = (x.position(col_var), y.position(row_var)) else {
                    continue;
                };
                let r = matrix[i][j];
                area.push(
                    Mark::new(
                        Shape::rect(cx, cy, x.bandwidth(), y.bandwidth()),
                        Style::fill(colors.color(r)).with_class("cell"),
                    )
                    .with_tooltip(format!("{} x {}: {:.2}", row_var, col_var, r)),
                );
                let ink = if r.abs() > DARK_CELL { "#ffffff" } else { "#222222" };
                area.push(
                    Mark::new(
                        Shape::text(
                            cx + x.bandwidth() / 2.0,
                            cy + y.bandwidth() / 2.0 + 4.0,
                            format!("{:.2}", r),
                            Anchor::Middle,
                        ),
                        Style::fill(ink).with_class("cell-label"),
                    )
                    .at_z(1),
                );
            }
        }

        area.extend(legend::gradient(
            &colors,
            (left + side + 20.0, top),
            120.0,
            9,
            |v| format::trim_decimals(v, 1),
        ));
        Ok(())
    }
}
