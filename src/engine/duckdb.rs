//! DuckDB engine implementation
//!
//! Provides a reader for DuckDB databases with direct Polars DataFrame integration.

use std::collections::BTreeSet;
use std::path::Path;

use duckdb::types::{TimeUnit, ValueRef};
use duckdb::{params, Config, Connection};
use polars::prelude::{Column, DataType, NamedFrom, Series};

use crate::engine::{connection::EngineLocation, Reader, ResultSet};
use crate::{DataFrame, DuckdashError, Result};

/// DuckDB database reader
///
/// Executes SQL against one DuckDB connection (in-memory or file-based) and
/// returns results as Polars DataFrames.
///
/// # Examples
///
/// ```rust,ignore
/// use duckdash::engine::{DuckDBReader, Reader};
///
/// let reader = DuckDBReader::from_connection_string("duckdb://memory")?;
/// let result = reader.execute("SELECT 1 as x, 2 as y")?;
/// ```
pub struct DuckDBReader {
    conn: Connection,
}

impl std::fmt::Debug for DuckDBReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDBReader").finish_non_exhaustive()
    }
}

impl DuckDBReader {
    /// Create a new DuckDB reader from a connection string with default settings
    pub fn from_connection_string(uri: &str) -> Result<Self> {
        Self::open(&uri.parse::<EngineLocation>()?, None)
    }

    /// Open a database with an explicit worker thread count
    ///
    /// # Arguments
    ///
    /// * `location` - Where the database lives
    /// * `threads` - DuckDB worker threads, or `None` for the engine default
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::EngineInit` if the configuration is rejected or
    /// the database cannot be opened.
    pub fn open(location: &EngineLocation, threads: Option<usize>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(threads) = threads {
            config = config.threads(threads as i64).map_err(|e| {
                DuckdashError::EngineInit(format!("Invalid thread count {}: {}", threads, e))
            })?;
        }

        let conn = match location {
            EngineLocation::Memory => {
                Connection::open_in_memory_with_flags(config).map_err(|e| {
                    DuckdashError::EngineInit(format!("Failed to open in-memory DuckDB: {}", e))
                })?
            }
            EngineLocation::File(path) => Connection::open_with_flags(path, config)
                .map_err(|e| {
                    DuckdashError::EngineInit(format!(
                        "Failed to open DuckDB file '{}': {}",
                        path.display(),
                        e
                    ))
                })?,
        };

        Ok(Self { conn })
    }

    /// Get a reference to the underlying DuckDB connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Make relative file references resolve inside `dir`
    pub fn set_file_search_path(&self, dir: &Path) -> Result<()> {
        let sql = format!(
            "SET file_search_path = '{}'",
            sql_string_literal(&dir.to_string_lossy())
        );
        self.execute_effect(&sql)
    }

    /// Close the connection, releasing the database
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| DuckdashError::InternalError(format!("Failed to close DuckDB: {}", e)))
    }
}

/// Escape text for use inside a single-quoted SQL string literal
pub(crate) fn sql_string_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Helper enum for building typed columns from rows
enum ColumnBuilder {
    Boolean(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    /// DECIMAL, HUGEINT and UBIGINT values as exact decimal text
    WideNumber(Vec<Option<String>>),
    Text(Vec<Option<String>>),
    Date32(Vec<Option<i32>>),
    /// Microseconds since the epoch
    Timestamp(Vec<Option<i64>>),
    /// Nanoseconds since midnight
    Time64(Vec<Option<i64>>),
    Fallback(Vec<Option<String>>),
}

impl ColumnBuilder {
    fn new(duckdb_type: duckdb::types::Type) -> Self {
        use duckdb::types::Type;
        match duckdb_type {
            Type::Boolean => ColumnBuilder::Boolean(Vec::new()),
            Type::TinyInt
            | Type::SmallInt
            | Type::Int
            | Type::BigInt
            | Type::UTinyInt
            | Type::USmallInt
            | Type::UInt => ColumnBuilder::Int(Vec::new()),
            Type::Float | Type::Double => ColumnBuilder::Float(Vec::new()),
            Type::Decimal | Type::HugeInt | Type::UBigInt => ColumnBuilder::WideNumber(Vec::new()),
            Type::Text => ColumnBuilder::Text(Vec::new()),
            Type::Date32 => ColumnBuilder::Date32(Vec::new()),
            Type::Timestamp => ColumnBuilder::Timestamp(Vec::new()),
            Type::Time64 => ColumnBuilder::Time64(Vec::new()),
            _ => ColumnBuilder::Fallback(Vec::new()),
        }
    }

    fn is_wide_number(&self) -> bool {
        matches!(self, ColumnBuilder::WideNumber(_))
    }

    fn add_value(&mut self, row: &duckdb::Row, col_idx: usize) -> Result<()> {
        use ColumnBuilder::*;

        let value = row.get_ref(col_idx).map_err(|e| {
            DuckdashError::ReaderError(format!("Failed to read column {}: {}", col_idx, e))
        })?;

        match self {
            Boolean(values) => values.push(match value {
                ValueRef::Boolean(b) => Some(b),
                _ => None,
            }),
            Int(values) => values.push(int_value(&value)),
            Float(values) => values.push(match value {
                ValueRef::Float(f) => Some(f as f64),
                ValueRef::Double(f) => Some(f),
                other => int_value(&other).map(|i| i as f64),
            }),
            WideNumber(values) => values.push(match value {
                ValueRef::Decimal(d) => Some(d.to_string()),
                ValueRef::HugeInt(i) => Some(i.to_string()),
                ValueRef::UBigInt(u) => Some(u.to_string()),
                other => int_value(&other).map(|i| i.to_string()),
            }),
            Text(values) => values.push(match value {
                ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            }),
            Date32(values) => values.push(match value {
                ValueRef::Date32(days) => Some(days),
                _ => None,
            }),
            Timestamp(values) => values.push(match value {
                ValueRef::Timestamp(unit, t) => Some(to_micros(unit, t)),
                _ => None,
            }),
            Time64(values) => values.push(match value {
                ValueRef::Time64(unit, t) => Some(to_micros(unit, t) * 1_000),
                _ => None,
            }),
            Fallback(values) => {
                if matches!(value, ValueRef::Null) {
                    values.push(None);
                } else {
                    // Fallback: try to get as String, or use empty string
                    let val: Option<String> = row.get(col_idx).ok();
                    values.push(val.or(Some(String::new())));
                }
            }
        }
        Ok(())
    }

    fn build(self, column_name: &str) -> Result<Series> {
        use ColumnBuilder::*;

        Ok(match self {
            Boolean(values) => Series::new(column_name.into(), values),
            Int(values) => Series::new(column_name.into(), values),
            Float(values) => Series::new(column_name.into(), values),
            WideNumber(values) => Series::new(column_name.into(), values),
            Text(values) => Series::new(column_name.into(), values),
            Date32(values) => {
                let series = Series::new(column_name.into(), values);
                series
                    .cast(&DataType::Date)
                    .map_err(|e| DuckdashError::ReaderError(format!("Date cast failed: {}", e)))?
            }
            Timestamp(values) => {
                let series = Series::new(column_name.into(), values);
                series
                    .cast(&DataType::Datetime(
                        polars::prelude::TimeUnit::Microseconds,
                        None,
                    ))
                    .map_err(|e| {
                        DuckdashError::ReaderError(format!("Timestamp cast failed: {}", e))
                    })?
            }
            Time64(values) => {
                let series = Series::new(column_name.into(), values);
                series
                    .cast(&DataType::Time)
                    .map_err(|e| DuckdashError::ReaderError(format!("Time cast failed: {}", e)))?
            }
            Fallback(values) => {
                tracing::warn!(
                    "Using fallback string conversion for column '{}'",
                    column_name
                );
                Series::new(column_name.into(), values)
            }
        })
    }
}

fn int_value(value: &ValueRef<'_>) -> Option<i64> {
    match *value {
        ValueRef::TinyInt(i) => Some(i as i64),
        ValueRef::SmallInt(i) => Some(i as i64),
        ValueRef::Int(i) => Some(i as i64),
        ValueRef::BigInt(i) => Some(i),
        ValueRef::UTinyInt(i) => Some(i as i64),
        ValueRef::USmallInt(i) => Some(i as i64),
        ValueRef::UInt(i) => Some(i as i64),
        _ => None,
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

impl Reader for DuckDBReader {
    fn execute(&self, sql: &str) -> Result<ResultSet> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DuckdashError::ReaderError(format!("Failed to prepare SQL: {}", e)))?;

        let mut rows = stmt
            .query(params![])
            .map_err(|e| DuckdashError::ReaderError(format!("Failed to execute SQL: {}", e)))?;

        // Column metadata is only available once the statement has run
        let (column_names, mut column_builders) = {
            let executed = rows.as_ref().ok_or_else(|| {
                DuckdashError::ReaderError("Statement produced no result schema".to_string())
            })?;
            let column_count = executed.column_count();
            if column_count == 0 {
                return Err(DuckdashError::ReaderError(
                    "Query returned no columns".to_string(),
                ));
            }

            let mut names = Vec::with_capacity(column_count);
            let mut builders = Vec::with_capacity(column_count);
            for i in 0..column_count {
                names.push(
                    executed
                        .column_name(i)
                        .map_err(|e| {
                            DuckdashError::ReaderError(format!("Failed to get column name: {}", e))
                        })?
                        .to_string(),
                );
                let data_type = executed.column_type(i);
                builders.push(ColumnBuilder::new(duckdb::types::Type::from(&data_type)));
            }
            (names, builders)
        };

        while let Some(row) = rows
            .next()
            .map_err(|e| DuckdashError::ReaderError(format!("Failed to iterate rows: {}", e)))?
        {
            for (col_idx, builder) in column_builders.iter_mut().enumerate() {
                builder.add_value(row, col_idx)?;
            }
        }

        let mut wide_numeric = BTreeSet::new();
        let mut columns: Vec<Column> = Vec::with_capacity(column_builders.len());
        for (name, builder) in column_names.iter().zip(column_builders.drain(..)) {
            if builder.is_wide_number() {
                wide_numeric.insert(name.clone());
            }
            columns.push(builder.build(name)?.into());
        }

        let frame = DataFrame::new(columns).map_err(|e| {
            DuckdashError::ReaderError(format!("Failed to create DataFrame: {}", e))
        })?;

        Ok(ResultSet {
            frame,
            wide_numeric,
        })
    }

    fn execute_effect(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DuckdashError::ReaderError(format!("Failed to execute statement: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{shape, ShapeSchema};
    use polars::prelude::DataType;

    #[test]
    fn test_create_in_memory() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory");
        assert!(reader.is_ok());
    }

    #[test]
    fn test_open_with_single_thread() {
        let reader = DuckDBReader::open(&EngineLocation::Memory, Some(1)).unwrap();
        let result = reader
            .execute("SELECT current_setting('threads') AS threads")
            .unwrap();
        assert_eq!(result.height(), 1);
    }

    #[test]
    fn test_simple_query() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let result = reader.execute("SELECT 1 as x, 2 as y").unwrap();

        assert_eq!(result.frame.shape(), (1, 2));
        assert_eq!(result.column_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_effect_then_query() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader
            .execute_effect("CREATE TABLE test(x INT, y INT); INSERT INTO test VALUES (1, 2), (3, 4);")
            .unwrap();

        let result = reader.execute("SELECT * FROM test").unwrap();
        assert_eq!(result.frame.shape(), (2, 2));
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        reader
            .execute_effect("CREATE TABLE empty_t(a INT, b VARCHAR)")
            .unwrap();

        let result = reader.execute("SELECT a, b FROM empty_t").unwrap();
        assert_eq!(result.height(), 0);
        assert_eq!(result.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_wide_numeric_columns_are_tagged() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let result = reader
            .execute(
                "SELECT CAST(12.50 AS DECIMAL(10,2)) AS price, \
                 CAST('12345678901234567890' AS HUGEINT) AS huge, \
                 SUM(x) AS total FROM (VALUES (1), (2)) t(x)",
            )
            .unwrap();

        assert!(result.wide_numeric.contains("price"));
        assert!(result.wide_numeric.contains("huge"));
        assert_eq!(
            result.frame.column("price").unwrap().dtype(),
            &DataType::String
        );

        let shaped = shape(&result, &ShapeSchema::default()).unwrap();
        assert_eq!(shaped.records[0].number("price"), Some(12.5));
        assert_eq!(shaped.records[0].number("total"), Some(3.0));
    }

    #[test]
    fn test_temporal_columns() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let result = reader
            .execute("SELECT DATE '2024-01-05' AS d, TIMESTAMP '2024-01-05 10:30:00' AS ts")
            .unwrap();

        assert_eq!(result.frame.column("d").unwrap().dtype(), &DataType::Date);
        assert!(matches!(
            result.frame.column("ts").unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
    }

    #[test]
    fn test_invalid_sql() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let result = reader.execute("INVALID SQL SYNTAX");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_table_is_reader_error() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        let err = reader.execute("SELECT * FROM nonexistent_table").unwrap_err();
        assert!(matches!(err, DuckdashError::ReaderError(_)));
    }

    #[test]
    fn test_sql_string_literal_escapes_quotes() {
        assert_eq!(sql_string_literal("it's"), "it''s");
    }
}
