//! Retained mark model for chart areas
//!
//! Renderers push [`Mark`]s into a [`ChartArea`]'s scene; writers turn scenes
//! into SVG. Marks that carry tooltip text are hover targets: the area hit
//! tests pointer positions against them and drives its single [`Tooltip`].

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::tooltip::Tooltip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Start,
    Middle,
    End,
}

impl Anchor {
    pub fn as_svg(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Polyline {
        points: Vec<(f64, f64)>,
    },
    /// Annular sector; angles in radians, clockwise from twelve o'clock
    Sector {
        cx: f64,
        cy: f64,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
    },
    /// Closed rings, filled with the even-odd rule
    Polygon {
        rings: Vec<Vec<(f64, f64)>>,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        anchor: Anchor,
        size: f64,
    },
}

/// Hover tolerance for lines, in pixels
const LINE_HIT_TOLERANCE: f64 = 4.0;

impl Shape {
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        // Normalize negative extents so hit testing and SVG agree
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 { (y + height, -height) } else { (y, height) };
        Shape::Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Shape::Line { x1, y1, x2, y2 }
    }

    pub fn text(x: f64, y: f64, content: impl Into<String>, anchor: Anchor) -> Self {
        Shape::Text {
            x,
            y,
            content: content.into(),
            anchor,
            size: 11.0,
        }
    }

    pub fn contains(&self, (px, py): (f64, f64)) -> bool {
        match self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => px >= *x && px <= x + width && py >= *y && py <= y + height,
            Shape::Line { x1, y1, x2, y2 } => {
                segment_distance((px, py), (*x1, *y1), (*x2, *y2)) <= LINE_HIT_TOLERANCE
            }
            Shape::Polyline { points } => points
                .windows(2)
                .any(|w| segment_distance((px, py), w[0], w[1]) <= LINE_HIT_TOLERANCE),
            Shape::Sector {
                cx,
                cy,
                inner,
                outer,
                start,
                end,
            } => {
                let (dx, dy) = (px - cx, py - cy);
                let r = dx.hypot(dy);
                if r < *inner || r > *outer {
                    return false;
                }
                // atan2 from twelve o'clock, clockwise, in [0, 2pi)
                let angle = (dy.atan2(dx) + FRAC_PI_2).rem_euclid(TAU);
                angle >= *start && angle <= *end
            }
            Shape::Polygon { rings } => {
                rings.iter().filter(|ring| in_ring((px, py), ring)).count() % 2 == 1
            }
            Shape::Circle { cx, cy, r } => (px - cx).hypot(py - cy) <= *r,
            Shape::Text { .. } => false,
        }
    }
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    };
    (p.0 - (a.0 + t * dx)).hypot(p.1 - (a.1 + t * dy))
}

fn in_ring(p: (f64, f64), ring: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > p.1) != (yj > p.1) && p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Point on a circle, angle clockwise from twelve o'clock
pub fn polar(cx: f64, cy: f64, r: f64, angle: f64) -> (f64, f64) {
    (cx + r * (angle - FRAC_PI_2).cos(), cy + r * (angle - FRAC_PI_2).sin())
}

/// Whether a sector spans more than half a turn
pub fn large_arc(start: f64, end: f64) -> bool {
    end - start > PI
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub opacity: f64,
    pub class: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
            class: None,
        }
    }
}

impl Style {
    pub fn fill(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn stroke(color: impl Into<String>, width: f64) -> Self {
        Self {
            stroke: Some(color.into()),
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(color.into());
        self.stroke_width = width;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub shape: Shape,
    pub style: Style,
    pub tooltip: Option<String>,
    /// Drawing order; higher draws later and wins hit tests
    pub z: i32,
}

impl Mark {
    pub fn new(shape: Shape, style: Style) -> Self {
        Self {
            shape,
            style,
            tooltip: None,
            z: 0,
        }
    }

    pub fn with_tooltip(mut self, text: impl Into<String>) -> Self {
        self.tooltip = Some(text.into());
        self
    }

    pub fn at_z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }
}

/// Pixel margins around the plotting region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 30.0,
            right: 30.0,
            bottom: 50.0,
            left: 60.0,
        }
    }
}

/// Outer size plus margins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl Frame {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margin: Margin::default(),
        }
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    /// Horizontal pixel range of the plotting region
    pub fn x_range(&self) -> (f64, f64) {
        (self.margin.left, self.width - self.margin.right)
    }

    /// Vertical pixel range, bottom first so larger values go up
    pub fn y_range(&self) -> (f64, f64) {
        (self.height - self.margin.bottom, self.margin.top)
    }

    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }
}

/// Everything drawn in one chart area
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    marks: Vec<Mark>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            marks: Vec::new(),
        }
    }

    pub fn push(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    pub fn extend(&mut self, marks: impl IntoIterator<Item = Mark>) {
        self.marks.extend(marks);
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Marks in drawing order
    pub fn ordered(&self) -> Vec<&Mark> {
        let mut marks: Vec<&Mark> = self.marks.iter().collect();
        marks.sort_by_key(|m| m.z);
        marks
    }

    /// Top-most hover target under `point`
    pub fn hit(&self, point: (f64, f64)) -> Option<&Mark> {
        self.ordered()
            .into_iter()
            .rev()
            .find(|m| m.tooltip.is_some() && m.shape.contains(point))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.marks
            .iter()
            .filter_map(|m| match &m.shape {
                Shape::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// What the area currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AreaStatus {
    #[default]
    Blank,
    Rendered,
    /// Nothing to draw; the message is shown instead
    Placeholder(String),
    /// The renderer failed; the message is shown instead
    Failed(String),
}

/// A uniquely identified region a chart owns exclusively
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArea {
    pub id: String,
    pub title: Option<String>,
    pub scene: Scene,
    pub tooltip: Tooltip,
    pub status: AreaStatus,
}

impl ChartArea {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            title: None,
            scene: Scene::new(width, height),
            tooltip: Tooltip::default(),
            status: AreaStatus::Blank,
        }
    }

    pub fn frame(&self) -> Frame {
        Frame::new(self.scene.width, self.scene.height)
    }

    /// Drop all prior output, including a visible tooltip
    pub fn clear(&mut self) {
        self.scene.clear();
        self.tooltip.hide();
        self.status = AreaStatus::Blank;
    }

    pub fn push(&mut self, mark: Mark) {
        self.scene.push(mark);
    }

    pub fn extend(&mut self, marks: impl IntoIterator<Item = Mark>) {
        self.scene.extend(marks);
    }

    fn centered_message(&mut self, message: &str, class: &str) {
        self.scene.clear();
        let (cx, cy) = (self.scene.width / 2.0, self.scene.height / 2.0);
        self.scene.push(Mark::new(
            Shape::text(cx, cy, message, Anchor::Middle),
            Style::fill("#666666").with_class(class),
        ));
    }

    pub fn show_placeholder(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.centered_message(&message, "placeholder");
        self.status = AreaStatus::Placeholder(message);
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.centered_message(&message, "render-error");
        self.status = AreaStatus::Failed(message);
    }

    pub fn pointer_move(&mut self, point: (f64, f64)) {
        match self.scene.hit(point).and_then(|m| m.tooltip.clone()) {
            Some(text) => self.tooltip.show(text, point),
            None => self.tooltip.hide(),
        }
    }

    pub fn pointer_leave(&mut self) {
        self.tooltip.hide();
    }
}
