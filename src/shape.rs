//! Result shaping
//!
//! Turns an engine [`ResultSet`] into plain records. All numeric coercion
//! happens here: renderers only ever see `f64` numbers, dates, text, booleans
//! and nulls.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::{DataType, Series, TimeUnit};
use serde::{Deserialize, Serialize};

use crate::engine::ResultSet;
use crate::{DuckdashError, Result};

/// A scalar value in a shaped record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable rendering used for labels and category keys
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// One result row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultRecord {
    pub fields: BTreeMap<String, Value>,
}

impl ResultRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Category key for a column: its display text, `None` when null or absent
    pub fn key(&self, column: &str) -> Option<String> {
        match self.get(column) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.display()),
        }
    }
}

/// Columns a step declares beyond what the engine types say
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShapeSchema {
    /// Text columns that must hold numbers
    pub numbers: Vec<String>,
    /// Text columns that must hold `YYYY-MM-DD` dates
    pub dates: Vec<String>,
}

/// A value that could not be coerced; it was replaced by `Null`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapingWarning {
    pub column: String,
    pub row: Option<usize>,
    pub message: String,
}

impl ShapingWarning {
    pub fn to_error(&self) -> DuckdashError {
        DuckdashError::Shaping {
            column: self.column.clone(),
            message: match self.row {
                Some(row) => format!("row {}: {}", row, self.message),
                None => self.message.clone(),
            },
        }
    }
}

impl std::fmt::Display for ShapingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Records plus any coercion warnings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapedResult {
    pub columns: Vec<String>,
    pub records: Vec<ResultRecord>,
    pub warnings: Vec<ShapingWarning>,
}

impl ShapedResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

enum Coercion {
    Number,
    Date,
    AsIs,
}

/// Shape a result set into records
///
/// Engine numeric types become `Value::Number`. Wide numerics and columns the
/// schema declares numeric are parsed from text; a value that does not parse
/// becomes `Null` and is reported in `warnings`.
pub fn shape(result: &ResultSet, schema: &ShapeSchema) -> Result<ShapedResult> {
    let frame = &result.frame;
    let height = frame.height();
    let columns = result.column_names();

    let mut warnings = Vec::new();
    for declared in schema.numbers.iter().chain(schema.dates.iter()) {
        if !columns.contains(declared) {
            warnings.push(ShapingWarning {
                column: declared.clone(),
                row: None,
                message: "declared column is missing from the result".to_string(),
            });
        }
    }

    let mut records: Vec<ResultRecord> = (0..height).map(|_| ResultRecord::default()).collect();

    for column in frame.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();
        let coercion = if result.wide_numeric.contains(&name) || schema.numbers.contains(&name) {
            Coercion::Number
        } else if schema.dates.contains(&name) {
            Coercion::Date
        } else {
            Coercion::AsIs
        };

        let values = column_values(series, &name, coercion, &mut warnings)?;
        for (record, value) in records.iter_mut().zip(values) {
            record.fields.insert(name.clone(), value);
        }
    }

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    Ok(ShapedResult {
        columns,
        records,
        warnings,
    })
}

fn shaping_error(column: &str, e: impl std::fmt::Display) -> DuckdashError {
    DuckdashError::Shaping {
        column: column.to_string(),
        message: e.to_string(),
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn column_values(
    series: &Series,
    name: &str,
    coercion: Coercion,
    warnings: &mut Vec<ShapingWarning>,
) -> Result<Vec<Value>> {
    let dtype = series.dtype().clone();

    if is_numeric(&dtype) {
        let floats = series
            .cast(&DataType::Float64)
            .map_err(|e| shaping_error(name, e))?;
        let ca = floats.f64().map_err(|e| shaping_error(name, e))?;
        return Ok(ca
            .into_iter()
            .map(|v| v.map(Value::Number).unwrap_or(Value::Null))
            .collect());
    }

    match dtype {
        DataType::Boolean => {
            let ca = series.bool().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
                .collect())
        }
        DataType::String => {
            let ca = series.str().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    None => Value::Null,
                    Some(text) => coerce_text(text, name, row, &coercion, warnings),
                })
                .collect())
        }
        DataType::Date => {
            let physical = series.to_physical_repr();
            let ca = physical.i32().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .map(|v| {
                    v.and_then(date_from_days)
                        .map(Value::Date)
                        .unwrap_or(Value::Null)
                })
                .collect())
        }
        DataType::Datetime(unit, _) => {
            let physical = series.to_physical_repr();
            let ca = physical.i64().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .map(|v| {
                    v.and_then(|t| datetime_from(unit, t))
                        .map(Value::DateTime)
                        .unwrap_or(Value::Null)
                })
                .collect())
        }
        DataType::Time => {
            let physical = series.to_physical_repr();
            let ca = physical.i64().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .map(|v| {
                    v.and_then(time_from_nanos)
                        .map(|t| Value::Text(t.format("%H:%M:%S").to_string()))
                        .unwrap_or(Value::Null)
                })
                .collect())
        }
        DataType::Null => Ok(vec![Value::Null; series.len()]),
        other => {
            let text = series
                .cast(&DataType::String)
                .map_err(|e| shaping_error(name, format!("unsupported type {}: {}", other, e)))?;
            let ca = text.str().map_err(|e| shaping_error(name, e))?;
            Ok(ca
                .into_iter()
                .map(|v| v.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null))
                .collect())
        }
    }
}

fn coerce_text(
    text: &str,
    column: &str,
    row: usize,
    coercion: &Coercion,
    warnings: &mut Vec<ShapingWarning>,
) -> Value {
    match coercion {
        Coercion::AsIs => Value::Text(text.to_string()),
        Coercion::Number => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => {
                warnings.push(ShapingWarning {
                    column: column.to_string(),
                    row: Some(row),
                    message: format!("'{}' is not a number", text),
                });
                Value::Null
            }
        },
        Coercion::Date => match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => {
                warnings.push(ShapingWarning {
                    column: column.to_string(),
                    row: Some(row),
                    message: format!("'{}' is not a date", text),
                });
                Value::Null
            }
        },
    }
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(days as i64))
}

fn datetime_from(unit: TimeUnit, value: i64) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => chrono::DateTime::from_timestamp_nanos(value),
        TimeUnit::Microseconds => chrono::DateTime::from_timestamp_micros(value)?,
        TimeUnit::Milliseconds => chrono::DateTime::from_timestamp_millis(value)?,
    };
    Some(dt.naive_utc())
}

fn time_from_nanos(nanos: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(nanos / 1_000_000_000).ok()?;
    let frac = u32::try_from(nanos % 1_000_000_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, frac)
}
