//! Scene to inline SVG

use std::fmt::Write as _;

use super::escape;
use crate::chart::scene::{large_arc, polar};
use crate::chart::{AreaStatus, ChartArea, Mark, Shape, Style};

/// Pixel coordinates with at most two decimals
fn px(value: f64) -> String {
    crate::chart::format::trim_decimals(value, 2)
}

fn style_attrs(style: &Style) -> String {
    let mut out = String::new();
    match &style.fill {
        Some(fill) => {
            let _ = write!(out, r#" fill="{}""#, escape(fill));
        }
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &style.stroke {
        let _ = write!(
            out,
            r#" stroke="{}" stroke-width="{}""#,
            escape(stroke),
            px(style.stroke_width)
        );
    }
    if style.opacity < 1.0 {
        let _ = write!(out, r#" opacity="{}""#, px(style.opacity));
    }
    if let Some(class) = &style.class {
        let _ = write!(out, r#" class="{}""#, escape(class));
    }
    out
}

fn points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", px(*x), px(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sector_path(cx: f64, cy: f64, inner: f64, outer: f64, start: f64, end: f64) -> String {
    let large = u8::from(large_arc(start, end));
    let (ox0, oy0) = polar(cx, cy, outer, start);
    let (ox1, oy1) = polar(cx, cy, outer, end);
    let mut d = format!(
        "M{},{}A{},{} 0 {} 1 {},{}",
        px(ox0),
        px(oy0),
        px(outer),
        px(outer),
        large,
        px(ox1),
        px(oy1)
    );
    if inner > 0.0 {
        let (ix1, iy1) = polar(cx, cy, inner, end);
        let (ix0, iy0) = polar(cx, cy, inner, start);
        let _ = write!(
            d,
            "L{},{}A{},{} 0 {} 0 {},{}Z",
            px(ix1),
            px(iy1),
            px(inner),
            px(inner),
            large,
            px(ix0),
            px(iy0)
        );
    } else {
        let _ = write!(d, "L{},{}Z", px(cx), px(cy));
    }
    d
}

/// One SVG element for a mark
pub fn mark(mark: &Mark) -> String {
    let attrs = style_attrs(&mark.style);
    let tooltip = mark
        .tooltip
        .as_deref()
        .map(|t| format!(r#" data-tooltip="{}""#, escape(t)))
        .unwrap_or_default();

    match &mark.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}"{}{}/>"#,
            px(*x),
            px(*y),
            px(*width),
            px(*height),
            attrs,
            tooltip
        ),
        Shape::Line { x1, y1, x2, y2 } => format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}"{}{}/>"#,
            px(*x1),
            px(*y1),
            px(*x2),
            px(*y2),
            attrs,
            tooltip
        ),
        Shape::Polyline { points: pts } => {
            format!(r#"<polyline points="{}"{}{}/>"#, points(pts), attrs, tooltip)
        }
        Shape::Sector {
            cx,
            cy,
            inner,
            outer,
            start,
            end,
        } => format!(
            r#"<path d="{}"{}{}/>"#,
            sector_path(*cx, *cy, *inner, *outer, *start, *end),
            attrs,
            tooltip
        ),
        Shape::Polygon { rings } => {
            let d: String = rings
                .iter()
                .filter(|r| !r.is_empty())
                .map(|r| format!("M{}Z", points(r).replace(' ', "L")))
                .collect();
            format!(r#"<path d="{}" fill-rule="evenodd"{}{}/>"#, d, attrs, tooltip)
        }
        Shape::Circle { cx, cy, r } => format!(
            r#"<circle cx="{}" cy="{}" r="{}"{}{}/>"#,
            px(*cx),
            px(*cy),
            px(*r),
            attrs,
            tooltip
        ),
        Shape::Text {
            x,
            y,
            content,
            anchor,
            size,
        } => format!(
            r#"<text x="{}" y="{}" text-anchor="{}" font-size="{}"{}{}>{}</text>"#,
            px(*x),
            px(*y),
            anchor.as_svg(),
            px(*size),
            attrs,
            tooltip,
            escape(content)
        ),
    }
}

/// The whole area as one `<svg>` element, marks in z order
pub fn render(area: &ChartArea) -> String {
    let status = match &area.status {
        AreaStatus::Blank => "blank",
        AreaStatus::Rendered => "rendered",
        AreaStatus::Placeholder(_) => "placeholder",
        AreaStatus::Failed(_) => "failed",
    };
    let mut out = format!(
        r#"<svg id="{}" class="chart" data-status="{}" width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"#,
        escape(&area.id),
        status,
        px(area.scene.width),
        px(area.scene.height),
        px(area.scene.width),
        px(area.scene.height)
    );
    for m in area.scene.ordered() {
        out.push_str(&mark(m));
    }
    out.push_str("</svg>");
    out
}
