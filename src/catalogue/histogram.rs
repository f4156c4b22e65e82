//! Histogram over a fixed domain with a mean marker

use serde::Deserialize;

use super::{ChartRenderer, RenderContext};
use crate::chart::scale::LinearScale;
use crate::chart::{axis, format, palette, stats, Anchor, Binner, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

fn default_bins() -> usize {
    20
}

fn default_sample_cap() -> usize {
    5000
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Histogram {
    pub value: String,
    /// Bucket bounds come from this domain, never from the sample
    pub domain: (f64, f64),
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Only the first `sample_cap` values are drawn
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
}

impl Histogram {
    fn sample(&self, records: &[ResultRecord]) -> Vec<f64> {
        records
            .iter()
            .filter_map(|r| r.number(&self.value))
            .filter(|v| v.is_finite())
            .take(self.sample_cap)
            .collect()
    }
}

impl ChartRenderer for Histogram {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.value.as_str()]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let sample = self.sample(records);
        if sample.is_empty() {
            return Ok(());
        }
        let binner = Binner::new(self.domain, self.bins);
        let buckets = binner.bin(sample.iter().copied());
        if buckets.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let x = LinearScale::new(self.domain, frame.x_range());
        let peak = buckets.iter().map(|b| b.count).max().unwrap_or(0) as f64;
        let y = LinearScale::new((0.0, peak.max(1.0)), frame.y_range()).nice(5);

        area.extend(axis::linear(&x, axis::Orient::Bottom, frame.y_range().0, 6, format::si));
        area.extend(axis::linear(&y, axis::Orient::Left, frame.x_range().0, 5, format::si));

        let baseline = y.map(0.0);
        for bucket in &buckets {
            let left = x.map(bucket.x0);
            let width = (x.map(bucket.x1) - left - 1.0).max(0.0);
            let top = y.map(bucket.count as f64);
            area.push(
                Mark::new(
                    Shape::rect(left + 0.5, top, width, baseline - top),
                    Style::fill(palette::CATEGORICAL[0]).with_class("bar"),
                )
                .with_tooltip(format!(
                    "{} - {}: {}",
                    format::trim_decimals(bucket.x0, 1),
                    format::trim_decimals(bucket.x1, 1),
                    format::grouped(bucket.count as f64)
                )),
            );
        }

        if let Some(mean) = stats::mean(&sample) {
            let mx = x.map(mean.clamp(self.domain.0, self.domain.1));
            let (bottom, top) = frame.y_range();
            area.push(
                Mark::new(
                    Shape::line(mx, bottom, mx, top),
                    Style::stroke(palette::MEAN_MARKER, 2.0).with_class("mean-line"),
                )
                .at_z(2),
            );
            area.push(
                Mark::new(
                    Shape::text(mx + 4.0, top + 12.0, format!("Mean: {}", format::trim_decimals(mean, 1)), Anchor::Start),
                    Style::fill(palette::MEAN_MARKER).with_class("mean-label"),
                )
                .at_z(2),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn chart(sample_cap: usize) -> Histogram {
        Histogram {
            value: "nota_redacao".to_string(),
            domain: (0.0, 1000.0),
            bins: 10,
            sample_cap,
        }
    }

    fn rows(values: &[f64]) -> Vec<ResultRecord> {
        values
            .iter()
            .map(|v| record(&[("nota_redacao", num(*v))]))
            .collect()
    }

    #[test]
    fn test_bins_and_mean_label() {
        let mut area = ChartArea::new("vizEssay", 800.0, 400.0);
        chart(5000)
            .draw(&rows(&[400.0, 600.0, 620.0, 980.0]), &RenderContext::default(), &mut area)
            .unwrap();

        let bars: Vec<&Mark> = area
            .scene
            .ordered()
            .into_iter()
            .filter(|m| m.style.class.as_deref() == Some("bar"))
            .collect();
        assert_eq!(bars.len(), 10);
        assert_eq!(bars[6].tooltip.as_deref(), Some("600 - 700: 2"));
        assert!(area.scene.texts().contains(&"Mean: 650"));
    }

    #[test]
    fn test_sample_cap_limits_values() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 * 10.0).collect();
        let capped = chart(10).sample(&rows(&values));
        assert_eq!(capped.len(), 10);
        assert_eq!(capped.last(), Some(&90.0));
    }

    #[test]
    fn test_deserialize_defaults() {
        let h: Histogram = toml::from_str(
            r#"
            value = "nota"
            domain = [0, 1000]
            "#,
        )
        .unwrap();
        assert_eq!(h.bins, 20);
        assert_eq!(h.sample_cap, 5000);
        assert_eq!(h.domain, (0.0, 1000.0));
    }
}
