//! One bar panel per metric, sharing a category color scale

use serde::Deserialize;

use super::{sorted_keys, ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, LinearScale, OrdinalColor};
use crate::chart::{axis, format, palette, Anchor, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

const PANEL_GAP: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmallMultiples {
    pub category: String,
    /// One panel per metric column, in this order
    pub metrics: Vec<String>,
}

impl ChartRenderer for SmallMultiples {
    fn required_columns(&self) -> Vec<&str> {
        std::iter::once(self.category.as_str())
            .chain(self.metrics.iter().map(String::as_str))
            .collect()
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let categories = sorted_keys(records, &self.category);
        if categories.is_empty() || self.metrics.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let colors = OrdinalColor::new(categories.clone(), palette::categorical(categories.len()));
        let count = self.metrics.len() as f64;
        let panel_width =
            ((frame.inner_width() - PANEL_GAP * (count - 1.0)) / count).max(10.0);

        for (i, metric) in self.metrics.iter().enumerate() {
            let left = frame.margin.left + i as f64 * (panel_width + PANEL_GAP);
            let values: Vec<(String, f64)> = records
                .iter()
                .filter_map(|r| Some((r.key(&self.category)?, r.number(metric)?)))
                .collect();

            let x = BandScale::new(categories.clone(), (left, left + panel_width)).padding(0.15);
            let y = LinearScale::from_extent(values.iter().map(|v| v.1), frame.y_range())
                .with_zero()
                .nice(4);

            area.push(Mark::new(
                Shape::text(left + panel_width / 2.0, frame.margin.top - 8.0, metric.clone(), Anchor::Middle),
                Style::fill("#222222").with_class("panel-title"),
            ));
            area.extend(axis::band(&x, axis::Orient::Bottom, frame.y_range().0, (left, left + panel_width)));
            area.extend(axis::linear(&y, axis::Orient::Left, left, 4, format::si));

            let baseline = y.map(0.0);
            for (category, value) in &values {
                let Some(x0) = x.position(category) else {
                    continue;
                };
                let top = y.map(*value);
                area.push(
                    Mark::new(
                        Shape::rect(x0, top, x.bandwidth(), baseline - top),
                        Style::fill(colors.color(category)).with_class("bar"),
                    )
                    .with_tooltip(format!(
                        "{} - {}: {}",
                        metric,
                        category,
                        format::trim_decimals(*value, 2)
                    )),
                );
            }
        }
        Ok(())
    }
}
