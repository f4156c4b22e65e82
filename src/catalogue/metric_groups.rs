//! Grouped bars over a small group set with one bar per metric column

use serde::Deserialize;

use super::{sorted_keys, ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, LinearScale, OrdinalColor};
use crate::chart::{axis, format, legend, palette, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricGroups {
    /// Column naming the group of a (wide) row
    pub group: String,
    /// Metric columns drawn side by side within each group
    pub metrics: Vec<String>,
}

impl ChartRenderer for MetricGroups {
    fn required_columns(&self) -> Vec<&str> {
        std::iter::once(self.group.as_str())
            .chain(self.metrics.iter().map(String::as_str))
            .collect()
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let mut bars = Vec::new();
        for record in records {
            let Some(group) = record.key(&self.group) else {
                continue;
            };
            for metric in &self.metrics {
                if let Some(value) = record.number(metric) {
                    bars.push((group.clone(), metric.clone(), value));
                }
            }
        }
        if bars.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let outer = BandScale::new(sorted_keys(records, &self.group), frame.x_range()).padding_inner(0.2);
        let inner = BandScale::new(self.metrics.clone(), (0.0, outer.bandwidth())).padding(0.05);
        let y = LinearScale::from_extent(bars.iter().map(|b| b.2), frame.y_range())
            .with_zero()
            .nice(5);
        let colors = OrdinalColor::new(self.metrics.clone(), palette::categorical(self.metrics.len()));

        area.extend(axis::horizontal_grid(&y, frame.x_range(), 5));
        area.extend(axis::band(&outer, axis::Orient::Bottom, frame.y_range().0, frame.x_range()));
        area.extend(axis::linear(&y, axis::Orient::Left, frame.x_range().0, 5, format::si));

        let baseline = y.map(0.0);
        for (group, metric, value) in &bars {
            let (Some(x0), Some(x1)) = (outer.position(group), inner.position(metric)) else {
                continue;
            };
            let top = y.map(*value);
            area.push(
                Mark::new(
                    Shape::rect(x0 + x1, top, inner.bandwidth(), baseline - top),
                    Style::fill(colors.color(metric)).with_class("bar"),
                )
                .with_tooltip(format!(
                    "{} - {}: {}",
                    group,
                    metric,
                    format::trim_decimals(*value, 2)
                )),
            );
        }

        area.extend(legend::categorical(
            &colors,
            (frame.x_range().1 - 140.0, frame.margin.top),
        ));
        Ok(())
    }
}
