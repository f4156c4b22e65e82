//! Region map colored by an aggregate joined on a string id

use std::collections::HashMap;

use serde::Deserialize;

use super::{ChartRenderer, RenderContext};
use crate::chart::geo::Mercator;
use crate::chart::scale::{extent, ColorRamp, SequentialColor};
use crate::chart::{format, legend, palette, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::{DuckdashError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choropleth {
    /// Column holding the region id, matched against feature ids
    pub region: String,
    pub value: String,
}

impl ChartRenderer for Choropleth {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.region.as_str(), self.value.as_str()]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let geometry = ctx.geometry.ok_or_else(|| DuckdashError::Render {
            chart: area.id.clone(),
            message: "choropleth chart needs region geometry".to_string(),
        })?;
        let Some(bounds) = geometry.bounds() else {
            return Ok(());
        };

        let values: HashMap<String, f64> = records
            .iter()
            .filter_map(|r| Some((r.key(&self.region)?, r.number(&self.value)?)))
            .collect();

        let frame = area.frame();
        let (x0, x1) = frame.x_range();
        let (y1, y0) = frame.y_range();
        // Leave room below the map for the legend
        let projection = Mercator::fit(bounds, (x0, y0, x1, y1 - 30.0));
        let domain = extent(values.values().copied()).unwrap_or((0.0, 1.0));
        let colors = SequentialColor::new(domain, ColorRamp::new(palette::SEQUENTIAL_BLUES));

        for feature in &geometry.features {
            let rings: Vec<Vec<(f64, f64)>> = feature
                .polygons
                .iter()
                .flatten()
                .map(|ring| ring.iter().map(|&p| projection.project(p)).collect())
                .collect();
            let label = feature.name.as_deref().unwrap_or(&feature.id);
            let (fill, tooltip) = match values.get(&feature.id) {
                Some(v) => (colors.color(*v), format!("{}: {}", label, format::grouped(*v))),
                None => (palette::NO_DATA.to_string(), format!("{}: no data", label)),
            };
            area.push(
                Mark::new(
                    Shape::Polygon { rings },
                    Style::fill(fill).with_stroke("#ffffff", 0.5).with_class("region"),
                )
                .with_tooltip(tooltip),
            );
        }

        if !values.is_empty() {
            area.extend(legend::gradient(&colors, (x0, y1 - 14.0), 160.0, 8, format::si));
        }
        Ok(())
    }

    /// Regions are drawn even when no aggregate matched any of them
    fn draws_when_empty(&self) -> bool {
        true
    }
}
