//! Horizontal bars for the top N categories, largest first

use serde::Deserialize;

use super::{ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, ColorRamp, LinearScale, SequentialColor};
use crate::chart::{axis, format, palette, Anchor, ChartArea, Margin, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

fn default_top_n() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedBars {
    pub label: String,
    pub value: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl RankedBars {
    /// Descending by value; ties keep label order so output is stable
    fn ranked(&self, records: &[ResultRecord]) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = records
            .iter()
            .filter_map(|r| Some((r.key(&self.label)?, r.number(&self.value)?)))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(self.top_n);
        rows
    }
}

impl ChartRenderer for RankedBars {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.label.as_str(), self.value.as_str()]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let rows = self.ranked(records);
        if rows.is_empty() {
            return Ok(());
        }

        let frame = area.frame().with_margin(Margin {
            left: 140.0,
            right: 60.0,
            ..Margin::default()
        });
        let max = rows.iter().map(|r| r.1).fold(0.0, f64::max);
        let x = LinearScale::new((0.0, if max > 0.0 { max } else { 1.0 }), frame.x_range());
        let y = BandScale::new(
            rows.iter().map(|r| r.0.clone()).collect(),
            (frame.margin.top, frame.height - frame.margin.bottom),
        )
        .padding(0.1);
        let colors = SequentialColor::new(x.domain, ColorRamp::new(palette::SEQUENTIAL_BLUES));

        area.extend(axis::band(
            &y,
            axis::Orient::Left,
            frame.x_range().0,
            (frame.margin.top, frame.height - frame.margin.bottom),
        ));

        for (label, value) in &rows {
            let Some(top) = y.position(label) else {
                continue;
            };
            let left = x.map(0.0);
            let right = x.map(value.max(0.0));
            area.push(
                Mark::new(
                    Shape::rect(left, top, right - left, y.bandwidth()),
                    Style::fill(colors.color(*value)).with_class("bar"),
                )
                .with_tooltip(format!("{}: {}", label, format::grouped(*value))),
            );
            area.push(
                Mark::new(
                    Shape::text(
                        right + 4.0,
                        top + y.bandwidth() / 2.0 + 4.0,
                        format::si(*value),
                        Anchor::Start,
                    ),
                    Style::fill("#333333").with_class("value-label"),
                )
                .at_z(1),
            );
        }
        Ok(())
    }
}
