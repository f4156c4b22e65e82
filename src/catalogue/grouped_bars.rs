//! Vertical bars grouped by an outer category, colored by an inner one

use serde::Deserialize;

use super::{sorted_keys, ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, LinearScale, OrdinalColor};
use crate::chart::{axis, format, legend, palette, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupedBars {
    pub group: String,
    pub subgroup: String,
    pub value: String,
}

impl ChartRenderer for GroupedBars {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.group.as_str(), self.subgroup.as_str(), self.value.as_str()]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let bars: Vec<(String, String, f64)> = records
            .iter()
            .filter_map(|r| {
                Some((
                    r.key(&self.group)?,
                    r.key(&self.subgroup)?,
                    r.number(&self.value)?,
                ))
            })
            .collect();
        if bars.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let groups = sorted_keys(records, &self.group);
        let subgroups = sorted_keys(records, &self.subgroup);

        let outer = BandScale::new(groups, frame.x_range()).padding_inner(0.1);
        let inner = BandScale::new(subgroups.clone(), (0.0, outer.bandwidth())).padding(0.05);
        let y = LinearScale::from_extent(bars.iter().map(|b| b.2), frame.y_range())
            .with_zero()
            .nice(5);
        let colors = OrdinalColor::new(subgroups.clone(), palette::CATEGORY10);

        area.extend(axis::band(&outer, axis::Orient::Bottom, frame.y_range().0, frame.x_range()));
        area.extend(axis::linear(&y, axis::Orient::Left, frame.x_range().0, 5, format::si));

        let baseline = y.map(0.0);
        for (group, subgroup, value) in &bars {
            let (Some(x0), Some(x1)) = (outer.position(group), inner.position(subgroup)) else {
                continue;
            };
            let top = y.map(*value);
            area.push(
                Mark::new(
                    Shape::rect(x0 + x1, top, inner.bandwidth(), baseline - top),
                    Style::fill(colors.color(subgroup)).with_class("bar"),
                )
                .with_tooltip(format!(
                    "{} - {}\n{}",
                    group,
                    subgroup,
                    format::grouped(*value)
                )),
            );
        }

        area.extend(legend::categorical(
            &colors,
            (frame.x_range().1 - 150.0, frame.margin.top),
        ));
        Ok(())
    }
}
