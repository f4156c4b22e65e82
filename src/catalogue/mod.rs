//! The chart catalogue
//!
//! Ten renderers, each turning shaped records into marks in one
//! [`ChartArea`]. Renderers hold only their column configuration; every
//! call clears the area and redraws it completely.
//!
//! [`render_chart`] is the single entry point. It owns the common failure
//! policy: empty input draws a placeholder (unless the renderer draws its own
//! base layer, like a map), a required column missing from every row is a
//! [`DuckdashError::Render`], and the area shows the error instead of a chart.

use std::collections::HashSet;

use serde::Deserialize;

use crate::chart::geo::GeoCollection;
use crate::chart::ChartArea;
use crate::shape::ResultRecord;
use crate::{DuckdashError, Result};

pub mod box_plot;
pub mod choropleth;
pub mod correlation_heatmap;
pub mod grouped_bars;
pub mod histogram;
pub mod metric_groups;
pub mod pie;
pub mod ranked_bars;
pub mod small_multiples;
pub mod time_lines;

pub use box_plot::BoxPlot;
pub use choropleth::Choropleth;
pub use correlation_heatmap::CorrelationHeatmap;
pub use grouped_bars::GroupedBars;
pub use histogram::Histogram;
pub use metric_groups::MetricGroups;
pub use pie::Pie;
pub use ranked_bars::RankedBars;
pub use small_multiples::SmallMultiples;
pub use time_lines::TimeLines;

pub const EMPTY_MESSAGE: &str = "No data";

/// Inputs shared by all renderers of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    pub geometry: Option<&'a GeoCollection>,
}

/// A chart type
pub trait ChartRenderer {
    /// Columns that must be present in at least one record
    fn required_columns(&self) -> Vec<&str>;

    /// Draw `records` into a cleared `area`.
    ///
    /// Rows with missing or null values in the columns a renderer uses are
    /// skipped. Drawing nothing is not an error.
    fn draw(&self, records: &[ResultRecord], ctx: &RenderContext, area: &mut ChartArea)
        -> Result<()>;

    /// Whether `draw` still runs for an empty record set
    fn draws_when_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartKind {
    TimeLines(TimeLines),
    GroupedBars(GroupedBars),
    Pie(Pie),
    RankedBars(RankedBars),
    SmallMultiples(SmallMultiples),
    MetricGroups(MetricGroups),
    Histogram(Histogram),
    BoxPlot(BoxPlot),
    CorrelationHeatmap(CorrelationHeatmap),
    Choropleth(Choropleth),
}

impl ChartKind {
    pub fn renderer(&self) -> &dyn ChartRenderer {
        match self {
            ChartKind::TimeLines(c) => c,
            ChartKind::GroupedBars(c) => c,
            ChartKind::Pie(c) => c,
            ChartKind::RankedBars(c) => c,
            ChartKind::SmallMultiples(c) => c,
            ChartKind::MetricGroups(c) => c,
            ChartKind::Histogram(c) => c,
            ChartKind::BoxPlot(c) => c,
            ChartKind::CorrelationHeatmap(c) => c,
            ChartKind::Choropleth(c) => c,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::TimeLines(_) => "time_lines",
            ChartKind::GroupedBars(_) => "grouped_bars",
            ChartKind::Pie(_) => "pie",
            ChartKind::RankedBars(_) => "ranked_bars",
            ChartKind::SmallMultiples(_) => "small_multiples",
            ChartKind::MetricGroups(_) => "metric_groups",
            ChartKind::Histogram(_) => "histogram",
            ChartKind::BoxPlot(_) => "box_plot",
            ChartKind::CorrelationHeatmap(_) => "correlation_heatmap",
            ChartKind::Choropleth(_) => "choropleth",
        }
    }
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    400.0
}

/// One chart on a dashboard
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartConfig {
    /// Id of the area the chart owns
    pub target: String,
    /// Produce step whose records feed the chart
    pub step: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(flatten)]
    pub kind: ChartKind,
}

impl ChartConfig {
    pub fn new_area(&self) -> ChartArea {
        let mut area = ChartArea::new(&self.target, self.width, self.height);
        area.title = self.title.clone();
        area
    }
}

/// Clear `area` and draw `records` with the configured renderer
pub fn render_chart(
    config: &ChartConfig,
    records: &[ResultRecord],
    ctx: &RenderContext,
    area: &mut ChartArea,
) -> Result<()> {
    area.clear();
    area.title = config.title.clone();

    let renderer = config.kind.renderer();
    if records.is_empty() && !renderer.draws_when_empty() {
        area.show_placeholder(EMPTY_MESSAGE);
        return Ok(());
    }

    let present: HashSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .collect();
    let missing: Vec<&str> = renderer
        .required_columns()
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect();
    // Zero rows carry no column names to check
    if !records.is_empty() && !missing.is_empty() {
        let err = DuckdashError::Render {
            chart: config.target.clone(),
            message: format!(
                "{} chart needs column(s) {}",
                config.kind.name(),
                missing.join(", ")
            ),
        };
        area.show_error(err.to_string());
        return Err(err);
    }

    if let Err(err) = renderer.draw(records, ctx, area) {
        area.show_error(err.to_string());
        return Err(err);
    }

    if area.scene.is_empty() {
        area.show_placeholder(EMPTY_MESSAGE);
    } else {
        if let Some(title) = title_mark(area) {
            area.push(title);
        }
        area.status = crate::chart::AreaStatus::Rendered;
    }
    Ok(())
}

/// Distinct non-null keys of a column, numeric-aware sorted
pub(crate) fn sorted_keys(records: &[ResultRecord], column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys: Vec<String> = records
        .iter()
        .filter_map(|r| r.key(column))
        .filter(|k| seen.insert(k.clone()))
        .collect();
    sort_keys(&mut keys);
    keys
}

pub(crate) fn sort_keys(keys: &mut [String]) {
    if keys.iter().all(|k| k.parse::<f64>().is_ok()) {
        keys.sort_by(|a, b| {
            let (a, b) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            a.total_cmp(&b)
        });
    } else {
        keys.sort();
    }
}

/// Chart title mark at the top of the area
fn title_mark(area: &ChartArea) -> Option<crate::chart::Mark> {
    use crate::chart::{Anchor, Mark, Shape, Style};
    let title = area.title.as_ref()?;
    Some(
        Mark::new(
            Shape::Text {
                x: area.scene.width / 2.0,
                y: 18.0,
                content: title.clone(),
                anchor: Anchor::Middle,
                size: 14.0,
            },
            Style::fill("#222222").with_class("chart-title"),
        )
        .at_z(30),
    )
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::chart::AreaStatus;
    use crate::shape::Value;

    fn bars_config() -> ChartConfig {
        toml::from_str(
            r#"
            target = "vizRank"
            step = "ranking"
            title = "Top states"
            kind = "ranked_bars"
            label = "uf"
            value = "n"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_config_from_toml() {
        let config = bars_config();
        assert_eq!(config.width, 800.0);
        assert_eq!(config.kind.name(), "ranked_bars");
        assert_eq!(
            config.kind.renderer().required_columns(),
            vec!["uf", "n"]
        );
    }

    #[test]
    fn test_empty_records_draw_placeholder() {
        let config = bars_config();
        let mut area = config.new_area();
        render_chart(&config, &[], &RenderContext::default(), &mut area).unwrap();
        assert_eq!(area.status, AreaStatus::Placeholder(EMPTY_MESSAGE.to_string()));
    }

    #[test]
    fn test_missing_column_is_render_error() {
        let config = bars_config();
        let mut area = config.new_area();
        let rows = vec![record(&[("uf", text("SP"))])];
        let err = render_chart(&config, &rows, &RenderContext::default(), &mut area).unwrap_err();
        assert!(matches!(err, DuckdashError::Render { ref chart, .. } if chart == "vizRank"));
        assert!(matches!(area.status, AreaStatus::Failed(_)));
    }

    #[test]
    fn test_rerender_replaces_previous_marks() {
        let config = bars_config();
        let mut area = config.new_area();
        let ctx = RenderContext::default();
        let many: Vec<_> = (0..8)
            .map(|i| record(&[("uf", text(&format!("S{i}"))), ("n", num(i as f64 + 1.0))]))
            .collect();
        let few = vec![record(&[("uf", text("SP")), ("n", num(3.0))])];

        render_chart(&config, &many, &ctx, &mut area).unwrap();
        let first = area.scene.len();
        render_chart(&config, &few, &ctx, &mut area).unwrap();
        let second = area.scene.len();
        render_chart(&config, &few, &ctx, &mut area).unwrap();

        assert!(second < first);
        assert_eq!(area.scene.len(), second);
        assert!(!area.scene.texts().iter().any(|t| t.contains("S7")));
    }

    #[test]
    fn test_sorted_keys_numeric_aware() {
        let rows = vec![
            record(&[("ano", num(2022.0))]),
            record(&[("ano", num(2018.0))]),
            record(&[("ano", Value::Null)]),
            record(&[("ano", num(2020.0))]),
            record(&[("ano", num(2018.0))]),
        ];
        assert_eq!(sorted_keys(&rows, "ano"), vec!["2018", "2020", "2022"]);

        let mut keys = vec!["9".to_string(), "10".to_string()];
        sort_keys(&mut keys);
        assert_eq!(keys, vec!["9", "10"]);
    }
}
