//! One line per series over a day-of-period axis

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{sort_keys, ChartRenderer, RenderContext};
use crate::chart::scale::{LinearScale, OrdinalColor, TimeScale};
use crate::chart::{axis, format, legend, palette, ChartArea, Mark, Shape, Style};
use crate::shape::{ResultRecord, Value};
use crate::Result;

fn default_period_format() -> String {
    "%m-%d".to_string()
}

fn default_axis_format() -> String {
    "%d/%m".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeLines {
    /// Column naming the line a row belongs to, e.g. the year
    pub series: String,
    /// Date, or text in `period_format`
    pub period: String,
    pub value: String,
    #[serde(default = "default_period_format")]
    pub period_format: String,
    #[serde(default = "default_axis_format")]
    pub axis_format: String,
}

impl TimeLines {
    /// Period text without a year is placed in a leap year so `02-29` parses
    fn parse_period(&self, value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::Text(text) => {
                if self.period_format.contains("%Y") {
                    NaiveDate::parse_from_str(text, &self.period_format).ok()
                } else {
                    NaiveDate::parse_from_str(
                        &format!("2000-{}", text),
                        &format!("%Y-{}", self.period_format),
                    )
                    .ok()
                }
            }
            _ => None,
        }
    }
}

impl ChartRenderer for TimeLines {
    fn required_columns(&self) -> Vec<&str> {
        vec![self.series.as_str(), self.period.as_str(), self.value.as_str()]
    }

    fn draw(&self, records: &[ResultRecord], _ctx: &RenderContext, area: &mut ChartArea) -> Result<()> {
        let mut lines: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for record in records {
            let (Some(series), Some(date), Some(value)) = (
                record.key(&self.series),
                record.get(&self.period).and_then(|v| self.parse_period(v)),
                record.number(&self.value),
            ) else {
                continue;
            };
            lines.entry(series).or_default().push((date, value));
        }
        if lines.is_empty() {
            return Ok(());
        }

        let frame = area.frame();
        let Some(x) = TimeScale::from_dates(
            lines.values().flatten().map(|(d, _)| *d),
            frame.x_range(),
        ) else {
            return Ok(());
        };
        let y = LinearScale::from_extent(lines.values().flatten().map(|(_, v)| *v), frame.y_range())
            .with_zero()
            .nice(5);

        let mut keys: Vec<String> = lines.keys().cloned().collect();
        sort_keys(&mut keys);
        let colors = OrdinalColor::new(keys.clone(), palette::categorical(keys.len()));

        area.extend(axis::horizontal_grid(&y, frame.x_range(), 5));
        area.extend(axis::time(&x, axis::Orient::Bottom, frame.y_range().0, 6, &self.axis_format));
        area.extend(axis::linear(&y, axis::Orient::Left, frame.x_range().0, 5, format::si));

        for key in &keys {
            let Some(points) = lines.get_mut(key) else {
                continue;
            };
            points.sort_by_key(|(d, _)| *d);
            let color = colors.color(key);

            let path: Vec<(f64, f64)> = points.iter().map(|(d, v)| (x.map(*d), y.map(*v))).collect();
            area.push(
                Mark::new(
                    Shape::Polyline { points: path },
                    Style::stroke(color.clone(), 2.0).with_class("line"),
                )
                .with_tooltip(key.clone()),
            );
            for (d, v) in points.iter() {
                area.push(
                    Mark::new(
                        Shape::Circle {
                            cx: x.map(*d),
                            cy: y.map(*v),
                            r: 3.0,
                        },
                        Style::fill(color.clone()),
                    )
                    .with_tooltip(format!(
                        "{} {}: {}",
                        key,
                        d.format(&self.axis_format),
                        format::grouped(*v)
                    ))
                    .at_z(1),
                );
            }
        }

        area.extend(legend::categorical(
            &colors,
            (frame.x_range().1 - 90.0, frame.margin.top),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn chart() -> TimeLines {
        TimeLines {
            series: "ano".to_string(),
            period: "dia_mes".to_string(),
            value: "num_corridas".to_string(),
            period_format: default_period_format(),
            axis_format: default_axis_format(),
        }
    }

    fn rows() -> Vec<ResultRecord> {
        let mut rows = Vec::new();
        for (year, base) in [("2018", 300_000.0), ("2020", 80_000.0), ("2022", 120_000.0)] {
            for day in 1..=31 {
                rows.push(record(&[
                    ("ano", text(year)),
                    ("dia_mes", text(&format!("12-{:02}", day))),
                    ("num_corridas", num(base + day as f64 * 100.0)),
                ]));
            }
        }
        rows
    }

    #[test]
    fn test_one_line_per_series() {
        let mut area = ChartArea::new("vizDaily", 800.0, 400.0);
        chart().draw(&rows(), &RenderContext::default(), &mut area).unwrap();

        let lines: Vec<&Mark> = area
            .scene
            .ordered()
            .into_iter()
            .filter(|m| matches!(m.shape, Shape::Polyline { .. }))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].style.stroke.as_deref(), Some("#0072B2"));
        assert!(area.scene.texts().contains(&"2022"));
    }

    #[test]
    fn test_point_hover_shows_value() {
        let mut area = ChartArea::new("vizDaily", 800.0, 400.0);
        let rows = vec![
            record(&[("ano", text("2018")), ("dia_mes", text("12-01")), ("num_corridas", num(1000.0))]),
            record(&[("ano", text("2018")), ("dia_mes", text("12-31")), ("num_corridas", num(2000.0))]),
        ];
        chart().draw(&rows, &RenderContext::default(), &mut area).unwrap();

        let frame = area.frame();
        // First point sits at the left edge of the plotting region
        let y = LinearScale::from_extent(vec![1000.0, 2000.0], frame.y_range())
            .with_zero()
            .nice(5);
        area.pointer_move((frame.x_range().0, y.map(1000.0)));
        assert_eq!(area.tooltip.text(), Some("2018 01/12: 1,000"));
    }

    #[test]
    fn test_unparseable_periods_skipped() {
        let mut area = ChartArea::new("vizDaily", 800.0, 400.0);
        let rows = vec![record(&[
            ("ano", text("2018")),
            ("dia_mes", text("not a day")),
            ("num_corridas", num(1.0)),
        ])];
        chart().draw(&rows, &RenderContext::default(), &mut area).unwrap();
        assert!(area.scene.is_empty());
    }

    #[test]
    fn test_parse_period_leap_day() {
        assert_eq!(
            chart().parse_period(&text("02-29")),
            NaiveDate::from_ymd_opt(2000, 2, 29)
        );
    }
}
