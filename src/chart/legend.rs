//! Legends

use super::scale::{OrdinalColor, SequentialColor};
use super::scene::{Anchor, Mark, Shape, Style};

const SWATCH: f64 = 12.0;
const ROW: f64 = 18.0;
const LEGEND_Z: i32 = 20;

/// A vertical swatch list for a categorical color scale, starting at `origin`
pub fn categorical(colors: &OrdinalColor, origin: (f64, f64)) -> Vec<Mark> {
    let mut marks = Vec::new();
    for (i, key) in colors.domain().iter().enumerate() {
        let y = origin.1 + ROW * i as f64;
        marks.push(
            Mark::new(
                Shape::rect(origin.0, y, SWATCH, SWATCH),
                Style::fill(colors.color(key)).with_class("legend-swatch"),
            )
            .at_z(LEGEND_Z),
        );
        marks.push(
            Mark::new(
                Shape::text(origin.0 + SWATCH + 5.0, y + SWATCH - 2.0, key.clone(), Anchor::Start),
                Style::fill("#333333").with_class("legend-label"),
            )
            .at_z(LEGEND_Z),
        );
    }
    marks
}

/// A horizontal gradient bar of `steps` cells with end labels
pub fn gradient(
    colors: &SequentialColor,
    origin: (f64, f64),
    width: f64,
    steps: usize,
    format: fn(f64) -> String,
) -> Vec<Mark> {
    let steps = steps.max(2);
    let (lo, hi) = colors.domain;
    let cell = width / steps as f64;

    let mut marks: Vec<Mark> = (0..steps)
        .map(|i| {
            let t = i as f64 / (steps - 1) as f64;
            Mark::new(
                Shape::rect(origin.0 + cell * i as f64, origin.1, cell, SWATCH),
                Style::fill(colors.color(lo + (hi - lo) * t)).with_class("legend-swatch"),
            )
            .at_z(LEGEND_Z)
        })
        .collect();

    for (x, value, anchor) in [(origin.0, lo, Anchor::Start), (origin.0 + width, hi, Anchor::End)] {
        marks.push(
            Mark::new(
                Shape::text(x, origin.1 + SWATCH + 12.0, format(value), anchor),
                Style::fill("#333333").with_class("legend-label"),
            )
            .at_z(LEGEND_Z),
        );
    }
    marks
}
