//! JSON payload: the run log plus every area as inline SVG

use serde_json::{json, Value};

use super::{svg, Page, Writer};
use crate::chart::AreaStatus;
use crate::{DuckdashError, Result};

#[derive(Debug, Clone, Default)]
pub struct JsonWriter {
    pretty: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// The payload as a JSON value
    pub fn to_value(page: &Page) -> Value {
        let charts: Vec<Value> = page
            .areas
            .iter()
            .map(|area| {
                let (status, message) = match &area.status {
                    AreaStatus::Blank => ("blank", None),
                    AreaStatus::Rendered => ("rendered", None),
                    AreaStatus::Placeholder(m) => ("placeholder", Some(m.clone())),
                    AreaStatus::Failed(m) => ("failed", Some(m.clone())),
                };
                json!({
                    "id": area.id,
                    "title": area.title,
                    "status": status,
                    "message": message,
                    "svg": svg::render(area),
                })
            })
            .collect();

        json!({
            "title": page.title,
            "log": page.log,
            "has_errors": page.log.has_errors(),
            "charts": charts,
        })
    }
}

impl Writer for JsonWriter {
    fn write(&self, page: &Page) -> Result<String> {
        self.validate(page)?;
        let value = Self::to_value(page);
        let text = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(|e| DuckdashError::WriterError(format!("Failed to serialize page: {}", e)))
    }
}
