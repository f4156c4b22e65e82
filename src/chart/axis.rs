//! Axis builders
//!
//! Each builder returns the marks for one axis: the domain line, tick marks
//! and tick labels. Axis marks sit below data marks (negative z).

use super::palette;
use super::scale::{BandScale, LinearScale, TimeScale};
use super::scene::{Anchor, Mark, Shape, Style};

const TICK: f64 = 6.0;
const AXIS_Z: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orient {
    Bottom,
    Left,
}

fn axis_style() -> Style {
    Style::stroke(palette::AXIS, 1.0).with_class("axis")
}

fn label_style() -> Style {
    Style::fill(palette::AXIS).with_class("tick-label")
}

/// Ticks placed at `positions` with the given labels
fn ticks(
    orient: Orient,
    at: f64,
    span: (f64, f64),
    positions: impl IntoIterator<Item = (f64, String)>,
) -> Vec<Mark> {
    let mut marks = Vec::new();
    let domain = match orient {
        Orient::Bottom => Shape::line(span.0, at, span.1, at),
        Orient::Left => Shape::line(at, span.0, at, span.1),
    };
    marks.push(Mark::new(domain, axis_style()).at_z(AXIS_Z));

    for (pos, label) in positions {
        let (tick, text) = match orient {
            Orient::Bottom => (
                Shape::line(pos, at, pos, at + TICK),
                Shape::text(pos, at + TICK + 12.0, label, Anchor::Middle),
            ),
            Orient::Left => (
                Shape::line(at - TICK, pos, at, pos),
                Shape::text(at - TICK - 3.0, pos + 4.0, label, Anchor::End),
            ),
        };
        marks.push(Mark::new(tick, axis_style()).at_z(AXIS_Z));
        marks.push(Mark::new(text, label_style()).at_z(AXIS_Z));
    }
    marks
}

/// Axis for a linear scale, labels from `format`
pub fn linear(
    scale: &LinearScale,
    orient: Orient,
    at: f64,
    count: usize,
    format: fn(f64) -> String,
) -> Vec<Mark> {
    let positions = scale
        .ticks(count)
        .into_iter()
        .map(|t| (scale.map(t), format(t)));
    ticks(orient, at, scale.range, positions)
}

/// Axis for a band scale, one label per band center
pub fn band(scale: &BandScale, orient: Orient, at: f64, range: (f64, f64)) -> Vec<Mark> {
    let positions: Vec<(f64, String)> = scale
        .domain()
        .iter()
        .filter_map(|key| scale.center(key).map(|c| (c, key.clone())))
        .collect();
    ticks(orient, at, range, positions)
}

/// Axis for a time scale, labels in `chrono` format syntax
pub fn time(scale: &TimeScale, orient: Orient, at: f64, count: usize, format: &str) -> Vec<Mark> {
    let positions: Vec<(f64, String)> = scale
        .ticks(count)
        .into_iter()
        .map(|d| (scale.map(d), d.format(format).to_string()))
        .collect();
    ticks(orient, at, scale.range, positions)
}

/// Horizontal grid lines across `x_range` at the scale's ticks
pub fn horizontal_grid(scale: &LinearScale, x_range: (f64, f64), count: usize) -> Vec<Mark> {
    scale
        .ticks(count)
        .into_iter()
        .map(|t| {
            let y = scale.map(t);
            Mark::new(
                Shape::line(x_range.0, y, x_range.1, y),
                Style::stroke(palette::GRID, 1.0).with_class("grid"),
            )
            .at_z(AXIS_Z - 1)
        })
        .collect()
}

/// Axis title centered along the axis
pub fn title(orient: Orient, span: (f64, f64), at: f64, text: &str) -> Mark {
    let mid = (span.0 + span.1) / 2.0;
    let shape = match orient {
        Orient::Bottom => Shape::text(mid, at + 38.0, text, Anchor::Middle),
        Orient::Left => Shape::text(at - 45.0, mid, text, Anchor::Middle),
    };
    Mark::new(shape, label_style().with_class("axis-title")).at_z(AXIS_Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::format;

    #[test]
    fn test_linear_axis_has_label_per_tick() {
        let scale = LinearScale::new((0.0, 100.0), (350.0, 30.0));
        let marks = linear(&scale, Orient::Left, 60.0, 5, format::si);
        let labels: Vec<&Mark> = marks
            .iter()
            .filter(|m| matches!(m.shape, Shape::Text { .. }))
            .collect();
        assert_eq!(labels.len(), scale.ticks(5).len());
        assert!(marks.iter().all(|m| m.z < 0));
    }

    #[test]
    fn test_band_axis_labels() {
        let scale = BandScale::new(vec!["SP".into(), "RJ".into()], (60.0, 570.0));
        let marks = band(&scale, Orient::Bottom, 350.0, (60.0, 570.0));
        let texts: Vec<String> = marks
            .iter()
            .filter_map(|m| match &m.shape {
                Shape::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["SP", "RJ"]);
    }
}
