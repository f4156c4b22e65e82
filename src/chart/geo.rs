//! Region geometry for choropleths
//!
//! Reads the polygon features of a GeoJSON FeatureCollection and projects
//! them with a Mercator projection fitted to a pixel box.

use std::f64::consts::FRAC_PI_4;

use serde_json::Value as Json;

use crate::shape::Value;
use crate::{DuckdashError, Result};

/// Rings of one polygon, in longitude/latitude
pub type Polygon = Vec<Vec<(f64, f64)>>;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// Join key against aggregate rows
    pub id: String,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoCollection {
    pub features: Vec<GeoFeature>,
}

fn geometry_error(message: impl Into<String>) -> DuckdashError {
    DuckdashError::ReaderError(format!("Invalid geometry: {}", message.into()))
}

impl GeoCollection {
    /// Parse a FeatureCollection.
    ///
    /// The id comes from `id_property` when given, otherwise from the feature
    /// `id`. Features without an id or without polygon geometry are skipped.
    pub fn from_json(bytes: &[u8], id_property: Option<&str>) -> Result<Self> {
        let root: Json = serde_json::from_slice(bytes).map_err(|e| geometry_error(e.to_string()))?;
        if root.get("type").and_then(Json::as_str) != Some("FeatureCollection") {
            return Err(geometry_error("expected a FeatureCollection"));
        }
        let features = root
            .get("features")
            .and_then(Json::as_array)
            .ok_or_else(|| geometry_error("missing features array"))?;

        let mut parsed = Vec::with_capacity(features.len());
        for feature in features {
            let properties = feature.get("properties");
            let id = match id_property {
                Some(key) => properties.and_then(|p| p.get(key)),
                None => feature.get("id"),
            }
            .and_then(scalar_text);
            let Some(id) = id else {
                tracing::debug!("Skipping feature without id");
                continue;
            };
            let name = properties
                .and_then(|p| p.get("name"))
                .and_then(Json::as_str)
                .map(str::to_string);

            let polygons = feature
                .get("geometry")
                .map(read_geometry)
                .unwrap_or_default();
            if polygons.is_empty() {
                continue;
            }
            parsed.push(GeoFeature { id, name, polygons });
        }

        Ok(Self { features: parsed })
    }

    /// Longitude/latitude bounds `(west, south, east, north)`
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .features
            .iter()
            .flat_map(|f| f.polygons.iter())
            .flat_map(|p| p.iter())
            .flat_map(|r| r.iter());
        let first = *points.next()?;
        Some(points.fold(
            (first.0, first.1, first.0, first.1),
            |(w, s, e, n), &(x, y)| (w.min(x), s.min(y), e.max(x), n.max(y)),
        ))
    }
}

/// Feature ids are compared with record keys, so numbers go through the
/// same formatting as [`Value::display`]: `35.0` becomes `"35"`
fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => n.as_f64().map(|f| Value::Number(f).display()),
        _ => None,
    }
}

fn read_ring(value: &Json) -> Option<Vec<(f64, f64)>> {
    value
        .as_array()?
        .iter()
        .map(|pos| {
            let pos = pos.as_array()?;
            Some((pos.first()?.as_f64()?, pos.get(1)?.as_f64()?))
        })
        .collect()
}

fn read_polygon(value: &Json) -> Option<Polygon> {
    value.as_array()?.iter().map(read_ring).collect()
}

fn read_geometry(geometry: &Json) -> Vec<Polygon> {
    let coordinates = geometry.get("coordinates");
    match geometry.get("type").and_then(Json::as_str) {
        Some("Polygon") => coordinates.and_then(read_polygon).into_iter().collect(),
        Some("MultiPolygon") => coordinates
            .and_then(Json::as_array)
            .map(|polys| polys.iter().filter_map(read_polygon).collect())
            .unwrap_or_default(),
        _ => vec![],
    }
}

/// Spherical Mercator scaled and centered to fit a pixel box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    scale: f64,
    offset: (f64, f64),
}

fn raw_mercator((lon, lat): (f64, f64)) -> (f64, f64) {
    let lat = lat.clamp(-85.0, 85.0).to_radians();
    (lon.to_radians(), -(FRAC_PI_4 + lat / 2.0).tan().ln())
}

impl Mercator {
    /// Fit `bounds` into the box `(x0, y0, x1, y1)` keeping the aspect ratio
    pub fn fit(bounds: (f64, f64, f64, f64), frame: (f64, f64, f64, f64)) -> Self {
        let (w, s, e, n) = bounds;
        let (left, top) = raw_mercator((w, n));
        let (right, bottom) = raw_mercator((e, s));
        let (fx0, fy0, fx1, fy1) = frame;

        let span_x = (right - left).max(f64::EPSILON);
        let span_y = (bottom - top).max(f64::EPSILON);
        let scale = ((fx1 - fx0) / span_x).min((fy1 - fy0) / span_y);

        let pad_x = (fx1 - fx0 - span_x * scale) / 2.0;
        let pad_y = (fy1 - fy0 - span_y * scale) / 2.0;
        Self {
            scale,
            offset: (fx0 + pad_x - left * scale, fy0 + pad_y - top * scale),
        }
    }

    pub fn project(&self, point: (f64, f64)) -> (f64, f64) {
        let (x, y) = raw_mercator(point);
        (x * self.scale + self.offset.0, y * self.scale + self.offset.1)
    }
}
