//! Pie and donut charts

use std::f64::consts::TAU;

use serde::Deserialize;

use super::{ChartRenderer, RenderContext};
use crate::chart::scale::OrdinalColor;
use crate::chart::scene::polar;
use crate::chart::{format, legend, palette, Anchor, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

/// Slices smaller than this share of the whole get no label
const LABEL_MIN_SHARE: f64 = 0.04;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Pie {
    pub label: String,
    pub value: String,
    /// Hole radius as a fraction of the outer radius; 0 draws a full pie
    #[serde(default)]
    pub inner_radius: f64,
}

impl ChartRenderer for Pie {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.label.as_str(), self.value.as_str()]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let slices: Vec<(String, f64)> = records
            .iter()
            .filter_map(|r| Some((r.key(&self.label)?, r.number(&self.value)?)))
            .filter(|(_, v)| *v > 0.0 && v.is_finite())
            .collect();
        let total: f64 = slices.iter().map(|(_, v)| v).sum();
        if slices.is_empty() || total <= 0.0 {
            return Ok(());
        }

        let frame = area.frame();
        let (cx, cy) = (
            frame.margin.left + frame.inner_width() / 2.0 - 60.0,
            frame.margin.top + frame.inner_height() / 2.0,
        );
        let outer = (frame.inner_width().min(frame.inner_height()) / 2.0).max(1.0);
        let inner = outer * self.inner_radius.clamp(0.0, 0.95);

        let keys: Vec<String> = slices.iter().map(|(k, _)| k.clone()).collect();
        let colors = OrdinalColor::new(keys, palette::categorical(slices.len()));

        let mut start = 0.0;
        for (label, value) in &slices {
            let share = value / total;
            let end = start + share * TAU;
            area.push(
                Mark::new(
                    Shape::Sector {
                        cx,
                        cy,
                        inner,
                        outer,
                        start,
                        end,
                    },
                    Style::fill(colors.color(label))
                        .with_stroke("#ffffff", 1.0)
                        .with_class("slice"),
                )
                .with_tooltip(format!(
                    "{}: {} ({})",
                    label,
                    format::grouped(*value),
                    format::percent(*value, total)
                )),
            );

            if share >= LABEL_MIN_SHARE {
                let (lx, ly) = polar(cx, cy, (inner + outer) / 2.0, (start + end) / 2.0);
                area.push(
                    Mark::new(
                        Shape::text(lx, ly + 4.0, format::percent(*value, total), Anchor::Middle),
                        Style::fill("#ffffff").with_class("slice-label"),
                    )
                    .at_z(1),
                );
            }
            start = end;
        }

        area.extend(legend::categorical(
            &colors,
            (cx + outer + 30.0, frame.margin.top),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn chart(inner_radius: f64) -> Pie {
        Pie {
            label: "tipo_escola".to_string(),
            value: "n".to_string(),
            inner_radius,
        }
    }

    fn rows() -> Vec<ResultRecord> {
        vec![
            record(&[("tipo_escola", text("Public")), ("n", num(300.0))]),
            record(&[("tipo_escola", text("Private")), ("n", num(100.0))]),
            record(&[("tipo_escola", text("Unknown")), ("n", num(0.0))]),
        ]
    }

    #[test]
    fn test_percentages_from_slice_sum() {
        let mut area = ChartArea::new("vizSchool", 600.0, 400.0);
        chart(0.0).draw(&rows(), &RenderContext::default(), &mut area).unwrap();

        let texts = area.scene.texts();
        assert!(texts.contains(&"75%"));
        assert!(texts.contains(&"25%"));

        let slices: Vec<&Mark> = area
            .scene
            .ordered()
            .into_iter()
            .filter(|m| matches!(m.shape, Shape::Sector { .. }))
            .collect();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].tooltip.as_deref(), Some("Public: 300 (75%)"));
    }

    #[test]
    fn test_sectors_cover_full_turn() {
        let mut area = ChartArea::new("vizSchool", 600.0, 400.0);
        chart(0.5).draw(&rows(), &RenderContext::default(), &mut area).unwrap();

        let ends: Vec<(f64, f64, f64)> = area
            .scene
            .ordered()
            .into_iter()
            .filter_map(|m| match m.shape {
                Shape::Sector {
                    start, end, inner, ..
                } => Some((start, end, inner)),
                _ => None,
            })
            .collect();
        assert_eq!(ends[0].0, 0.0);
        assert!((ends.last().unwrap().1 - TAU).abs() < 1e-9);
        assert!(ends.iter().all(|(_, _, inner)| *inner > 0.0));
    }

    #[test]
    fn test_all_zero_draws_nothing() {
        let rows = vec![record(&[("tipo_escola", text("A")), ("n", num(0.0))])];
        let mut area = ChartArea::new("vizSchool", 600.0, 400.0);
        chart(0.0).draw(&rows, &RenderContext::default(), &mut area).unwrap();
        assert!(area.scene.is_empty());
    }
}
