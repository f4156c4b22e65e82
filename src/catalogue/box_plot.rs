//! Box plots from precomputed quartile summaries

use serde::Deserialize;

use super::{sorted_keys, ChartRenderer, RenderContext};
use crate::chart::scale::{BandScale, LinearScale};
use crate::chart::{axis, format, palette, ChartArea, Mark, Shape, Style};
use crate::shape::ResultRecord;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoxPlot {
    pub category: String,
    pub min: String,
    pub q1: String,
    pub median: String,
    pub q3: String,
    pub max: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

impl BoxPlot {
    fn summary(&self, record: &ResultRecord) -> Option<Summary> {
        Some(Summary {
            min: record.number(&self.min)?,
            q1: record.number(&self.q1)?,
            median: record.number(&self.median)?,
            q3: record.number(&self.q3)?,
            max: record.number(&self.max)?,
        })
    }
}

impl ChartRenderer for BoxPlot {
    fn required_columns(&self) -> Vec<&str> {
        vec![
            self.category.as_str(),
            self.min.as_str(),
            self.q1.as_str(),
            self.median.as_str(),
            self.q3.as_str(),
            self.max.as_str(),
        ]
    }

    fn draw(
        &self,
        records: &[ResultRecord],
        _ctx: &RenderContext,
        area: &mut ChartArea,
    ) -> Result<()> {
        let boxes: Vec<(String, Summary)> = records
            .iter()
            .filter_map(|r| Some((r.key(&self.category)?, self.summary(r)?)))
            .collect();
        if boxes.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let x = BandScale::new(sorted_keys(records, &self.category), frame.x_range()).padding(0.3);
        let y = LinearScale::from_extent(
            boxes.iter().flat_map(|(_, s)| [s.min, s.max]),
            frame.y_range(),
        )
        .nice(5);

        area.extend(axis::band(&x, axis::Orient::Bottom, frame.y_range().0, frame.x_range()));
        area.extend(axis::linear(&y, axis::Orient::Left, frame.x_range().0, 5, format::si));

        let (bottom, top) = frame.y_range();
        let stroke = palette::AXIS;
        for (category, s) in &boxes {
            let Some(left) = x.position(category) else {
                continue;
            };
            let width = x.bandwidth();
            let center = left + width / 2.0;

            // Hover target spanning the whole column
            area.push(
                Mark::new(
                    Shape::rect(x.center(category).unwrap_or(center) - x.step() / 2.0, top, x.step(), bottom - top),
                    Style::fill("#ffffff").with_opacity(0.0).with_class("hover-target"),
                )
                .with_tooltip(format!(
                    "{}\nMax: {}\nQ3: {}\nMedian: {}\nQ1: {}\nMin: {}",
                    category,
                    format::trim_decimals(s.max, 1),
                    format::trim_decimals(s.q3, 1),
                    format::trim_decimals(s.median, 1),
                    format::trim_decimals(s.q1, 1),
                    format::trim_decimals(s.min, 1)
                ))
                .at_z(5),
            );
            area.push(Mark::new(
                Shape::line(center, y.map(s.min), center, y.map(s.max)),
                Style::stroke(stroke, 1.0).with_class("whisker"),
            ));
            for cap in [s.min, s.max] {
                area.push(Mark::new(
                    Shape::line(center - width / 4.0, y.map(cap), center + width / 4.0, y.map(cap)),
                    Style::stroke(stroke, 1.0).with_class("whisker"),
                ));
            }
            area.push(
                Mark::new(
                    Shape::rect(left, y.map(s.q3), width, y.map(s.q1) - y.map(s.q3)),
                    Style::fill(palette::CATEGORICAL[5])
                        .with_stroke(stroke, 1.0)
                        .with_class("box"),
                )
                .at_z(1),
            );
            area.push(
                Mark::new(
                    Shape::line(left, y.map(s.median), left + width, y.map(s.median)),
                    Style::stroke(stroke, 2.0).with_class("median"),
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

    fn chart() -> BoxPlot {
        BoxPlot {
            category: "regiao".to_string(),
            min: "minimo".to_string(),
            q1: "q1".to_string(),
            median: "mediana".to_string(),
            q3: "q3".to_string(),
            max: "maximo".to_string(),
        }
    }

    fn row(region: &str, base: f64) -> ResultRecord {
        record(&[
            ("regiao", text(region)),
            ("minimo", num(base)),
            ("q1", num(base + 100.0)),
            ("mediana", num(base + 200.0)),
            ("q3", num(base + 300.0)),
            ("maximo", num(base + 500.0)),
        ])
    }

    #[test]
    fn test_marks_per_box() {
        let mut area = ChartArea::new("vizBox", 800.0, 400.0);
        chart()
            .draw(&[row("Norte", 300.0), row("Sul", 400.0)], &RenderContext::default(), &mut area)
            .unwrap();

        let count = |class: &str| {
            area.scene
                .ordered()
                .into_iter()
                .filter(|m| m.style.class.as_deref() == Some(class))
                .count()
        };
        assert_eq!(count("box"), 2);
        assert_eq!(count("median"), 2);
        assert_eq!(count("whisker"), 6);
        assert_eq!(count("hover-target"), 2);
    }

    #[test]
    fn test_hover_anywhere_in_column() {
        let mut area = ChartArea::new("vizBox", 800.0, 400.0);
        chart()
            .draw(&[row("Norte", 300.0)], &RenderContext::default(), &mut area)
            .unwrap();
        let frame = area.frame();
        let mid_x = (frame.x_range().0 + frame.x_range().1) / 2.0;

        // Near the top of the plot, far above the whisker
        area.pointer_move((mid_x, frame.margin.top + 1.0));
        let text = area.tooltip.text().unwrap_or_default().to_string();
        assert!(text.starts_with("Norte"));
        assert!(text.contains("Median: 500"));
    }
}
