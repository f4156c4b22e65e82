//! Output writer abstraction layer for duckdash
//!
//! Writers turn a finished run into a presentation format. They never touch
//! the engine: a [`Page`] holds only the diagnostics log and the rendered
//! chart areas.
//!
//! # Example
//!
//! ```rust,ignore
//! use duckdash::writer::{HtmlWriter, Page, Writer};
//!
//! let page = Page::new("Taxi trips", &log, &areas);
//! let html = HtmlWriter::new().write(&page)?;
//! ```

use std::collections::HashSet;

use crate::chart::ChartArea;
use crate::diagnostics::DiagnosticsLog;
use crate::{DuckdashError, Result};

pub mod html;
pub mod json;
pub mod svg;

pub use html::HtmlWriter;
pub use json::JsonWriter;

/// Everything a writer may show for one run
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub title: &'a str,
    pub log: &'a DiagnosticsLog,
    pub areas: &'a [ChartArea],
    /// Endpoint the page's run button posts to; no button when `None`
    pub run_endpoint: Option<&'a str>,
}

impl<'a> Page<'a> {
    pub fn new(title: &'a str, log: &'a DiagnosticsLog, areas: &'a [ChartArea]) -> Self {
        Self {
            title,
            log,
            areas,
            run_endpoint: None,
        }
    }

    pub fn with_run_endpoint(mut self, endpoint: &'a str) -> Self {
        self.run_endpoint = Some(endpoint);
        self
    }
}

/// Trait for page output writers
pub trait Writer {
    /// Generate the formatted output for a page
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::WriterError` if the page cannot be written.
    fn write(&self, page: &Page) -> Result<String>;

    /// Check that a page can be written without generating output
    fn validate(&self, page: &Page) -> Result<()> {
        let mut seen = HashSet::new();
        for area in page.areas {
            if !seen.insert(area.id.as_str()) {
                return Err(DuckdashError::WriterError(format!(
                    "Duplicate chart area id '{}'",
                    area.id
                )));
            }
        }
        Ok(())
    }
}

/// Escape text for HTML and SVG content and attribute values
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_duplicate_area_ids_rejected() {
        let log = DiagnosticsLog::new();
        let areas = vec![
            ChartArea::new("vizA", 100.0, 100.0),
            ChartArea::new("vizA", 100.0, 100.0),
        ];
        let page = Page::new("t", &log, &areas);
        let err = HtmlWriter::new().validate(&page).unwrap_err();
        assert!(err.to_string().contains("vizA"));
    }
}
