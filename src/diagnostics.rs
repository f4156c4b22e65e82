//! Human-readable run log and the diagnostic summary block

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::shape::{ResultRecord, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub message: String,
}

/// Ordered status and error lines for one run.
///
/// Entries are only appended; [`DiagnosticsLog::clear`] starts a new run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticsLog {
    entries: Vec<DiagnosticEntry>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.entries.push(DiagnosticEntry {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    /// One line per entry, errors and warnings prefixed
    pub fn render_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| match e.severity {
                Severity::Info => e.message.clone(),
                Severity::Warning => format!("Warning: {}", e.message),
                Severity::Error => format!("Error: {}", e.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Columns of the diagnostic step's single row
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryFields {
    pub min_date: String,
    pub max_date: String,
    pub total_rows: String,
    pub years: String,
}

impl Default for SummaryFields {
    fn default() -> Self {
        Self {
            min_date: "min_date".to_string(),
            max_date: "max_date".to_string(),
            total_rows: "total_rows".to_string(),
            years: "years".to_string(),
        }
    }
}

pub const NO_DATA: &str = "No data found.";

/// Format the diagnostic summary block
///
/// An empty result, or one whose row total is null or zero, yields
/// [`NO_DATA`] instead of a block with blank fields.
pub fn format_summary(records: &[ResultRecord], fields: &SummaryFields) -> String {
    let Some(row) = records.first() else {
        return NO_DATA.to_string();
    };
    let total = match row.get(&fields.total_rows) {
        Some(Value::Number(n)) if *n > 0.0 => *n,
        _ => return NO_DATA.to_string(),
    };

    let period = match (
        date_text(row.get(&fields.min_date)),
        date_text(row.get(&fields.max_date)),
    ) {
        (Some(from), Some(to)) => format!("{} to {}", from, to),
        _ => "unknown".to_string(),
    };
    let years = row
        .key(&fields.years)
        .unwrap_or_else(|| "unknown".to_string());

    let lines = [
        "Data summary".to_string(),
        format!("Total rows: {}", thousands(total)),
        format!("Period: {}", period),
        format!("Years in sample: {}", years),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let border = format!("+{}+", "-".repeat(width + 2));

    let mut out = vec![border.clone()];
    for line in &lines {
        out.push(format!("| {:<width$} |", line, width = width));
    }
    out.push(border);
    out.join("\n")
}

fn date_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => Some(dt.date().format("%Y-%m-%d").to_string()),
        Value::Text(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> ResultRecord {
        let mut record = ResultRecord::default();
        for (k, v) in pairs {
            record.fields.insert(k.to_string(), v.clone());
        }
        record
    }

    #[test]
    fn test_log_is_ordered_and_clearable() {
        let mut log = DiagnosticsLog::new();
        log.info("Starting");
        log.warn("odd value");
        log.error("boom");
        assert!(log.has_errors());
        assert_eq!(
            log.render_text(),
            "Starting\nWarning: odd value\nError: boom"
        );
        log.clear();
        assert!(log.is_empty());
        assert!(!log.has_errors());
    }

    #[test]
    fn test_summary_no_records() {
        assert_eq!(format_summary(&[], &SummaryFields::default()), NO_DATA);
    }

    #[test]
    fn test_summary_null_total() {
        let r = row(&[("total_rows", Value::Null), ("years", Value::Null)]);
        assert_eq!(format_summary(&[r], &SummaryFields::default()), NO_DATA);
    }

    #[test]
    fn test_summary_block() {
        let r = row(&[
            (
                "min_date",
                Value::Date(NaiveDate::from_ymd_opt(2018, 12, 1).unwrap()),
            ),
            ("max_date", Value::Text("2022-12-31 23:59:00".to_string())),
            ("total_rows", Value::Number(21_345_678.0)),
            ("years", Value::Text("2018, 2020, 2022".to_string())),
        ]);
        let block = format_summary(&[r], &SummaryFields::default());
        assert!(block.contains("Total rows: 21,345,678"));
        assert!(block.contains("Period: 2018-12-01 to 2022-12-31"));
        assert!(block.contains("Years in sample: 2018, 2020, 2022"));
        assert!(block.starts_with('+'));
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(1000.0), "1,000");
        assert_eq!(thousands(-1234567.0), "-1,234,567");
    }
}
