//! CSV to Parquet conversion and column discovery
//!
//! Raw exports come with unknown separators and encodings. Conversion tries
//! the combinations in a fixed order and accepts the first one that parses
//! into more than one column, then reads the written Parquet file back to
//! validate it.

use std::path::{Path, PathBuf};

use crate::engine::duckdb::sql_string_literal;
use crate::engine::EngineHandle;
use crate::shape::{shape, ShapeSchema};
use crate::{DuckdashError, Result};

/// Encodings tried in order
pub const ENCODINGS: &[&str] = &["utf-8", "latin-1"];

/// Separators tried in order; `None` lets the engine sniff
pub const DELIMITERS: &[Option<char>] = &[Some(';'), Some(','), None];

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub encoding: &'static str,
    pub delimiter: Option<char>,
    pub rows: usize,
    pub columns: usize,
}

impl std::fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let delimiter = self
            .delimiter
            .map(|c| c.to_string())
            .unwrap_or_else(|| "auto".to_string());
        write!(
            f,
            "{} -> {} (encoding={}, sep={}): {} rows, {} columns",
            self.source.display(),
            self.output.display(),
            self.encoding,
            delimiter,
            self.rows,
            self.columns
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

fn read_csv_sql(path: &Path, encoding: &str, delimiter: Option<char>) -> String {
    let mut options = format!("header = true, encoding = '{}'", encoding);
    if let Some(delimiter) = delimiter {
        options.push_str(&format!(
            ", delim = '{}'",
            sql_string_literal(&delimiter.to_string())
        ));
    }
    format!(
        "read_csv('{}', {})",
        sql_string_literal(&path.to_string_lossy()),
        options
    )
}

fn parquet_sql(path: &Path) -> String {
    format!("read_parquet('{}')", sql_string_literal(&path.to_string_lossy()))
}

async fn count_rows(engine: &EngineHandle, from: &str) -> Result<usize> {
    let result = engine
        .query(&format!("SELECT COUNT(*) AS n FROM {}", from))
        .await?;
    let shaped = shape(&result, &ShapeSchema::default())?;
    Ok(shaped
        .records
        .first()
        .and_then(|r| r.number("n"))
        .unwrap_or(0.0) as usize)
}

async fn count_columns(engine: &EngineHandle, from: &str) -> Result<usize> {
    let result = engine
        .query(&format!("SELECT * FROM {} LIMIT 0", from))
        .await?;
    Ok(result.column_names().len())
}

/// Convert one CSV file into `<out_dir>/<stem>.parquet`
///
/// # Errors
///
/// Returns `DuckdashError::ReaderError` with the last engine message when
/// no encoding and separator combination parses the file, or when the
/// written file cannot be read back.
pub async fn convert_csv(
    engine: &EngineHandle,
    csv: &Path,
    out_dir: &Path,
) -> Result<ConversionReport> {
    let stem = csv
        .file_stem()
        .ok_or_else(|| DuckdashError::ValidationError(format!("Not a file: {}", csv.display())))?;
    tokio::fs::create_dir_all(out_dir).await?;
    let output = out_dir.join(format!("{}.parquet", stem.to_string_lossy()));

    let mut last_error = None;
    for &encoding in ENCODINGS {
        for &delimiter in DELIMITERS {
            let copy = format!(
                "COPY (SELECT * FROM {}) TO '{}' (FORMAT PARQUET)",
                read_csv_sql(csv, encoding, delimiter),
                sql_string_literal(&output.to_string_lossy())
            );
            if let Err(e) = engine.execute(&copy).await {
                tracing::debug!(
                    "{} with encoding={} sep={:?} failed: {}",
                    csv.display(),
                    encoding,
                    delimiter,
                    e
                );
                last_error = Some(e);
                continue;
            }

            let columns = count_columns(engine, &parquet_sql(&output)).await?;
            // A wrong explicit separator leaves each line in one column
            if columns < 2 && delimiter.is_some() {
                continue;
            }
            let rows = count_rows(engine, &parquet_sql(&output)).await?;
            if rows == 0 {
                tracing::warn!("{} is empty after conversion", output.display());
            }
            let report = ConversionReport {
                source: csv.to_path_buf(),
                output,
                encoding,
                delimiter,
                rows,
                columns,
            };
            tracing::info!("Converted {}", report);
            return Ok(report);
        }
    }

    Err(DuckdashError::ReaderError(format!(
        "Could not convert {}: {}",
        csv.display(),
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no separator produced more than one column".to_string())
    )))
}

/// Column names and engine types of a CSV, Parquet or JSON file
pub async fn describe_columns(engine: &EngineHandle, path: &Path) -> Result<Vec<ColumnInfo>> {
    let format = crate::registrar::FileFormat::from_name(&path.to_string_lossy()).ok_or_else(|| {
        DuckdashError::ValidationError(format!("Unrecognized file type: {}", path.display()))
    })?;
    let sql = format!(
        "DESCRIBE SELECT * FROM {}('{}')",
        format.reader_function(),
        sql_string_literal(&path.to_string_lossy())
    );
    let result = engine.query(&sql).await?;
    let shaped = shape(&result, &ShapeSchema::default())?;
    Ok(shaped
        .records
        .iter()
        .filter_map(|r| {
            Some(ColumnInfo {
                name: r.text("column_name")?.to_string(),
                data_type: r.text("column_type")?.to_string(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    async fn engine() -> EngineHandle {
        EngineHandle::acquire(&EngineConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("RESULTADOS_2024.csv");
        std::fs::write(&csv, "NU_INSCRICAO;NU_NOTA_MT\n1;512.3\n2;640.0\n3;701.9\n").unwrap();
        let engine = engine().await;

        let report = convert_csv(&engine, &csv, &dir.path().join("parquet")).await.unwrap();
        assert_eq!(report.delimiter, Some(';'));
        assert_eq!(report.encoding, "utf-8");
        assert_eq!((report.rows, report.columns), (3, 2));
        assert!(report.output.ends_with("parquet/RESULTADOS_2024.parquet"));
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_comma_file_skips_semicolon() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("trips.csv");
        std::fs::write(&csv, "id,distance,tip\n1,2.5,1.0\n2,3.1,0.0\n").unwrap();
        let engine = engine().await;

        let report = convert_csv(&engine, &csv, dir.path()).await.unwrap();
        assert_eq!(report.delimiter, Some(','));
        assert_eq!((report.rows, report.columns), (2, 3));

        let columns = describe_columns(&engine, &report.output).await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "distance", "tip"]);
        assert_eq!(columns[1].data_type, "DOUBLE");
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_latin1_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("participantes.csv");
        let mut bytes = b"UF;MUNICIPIO\nSP;S".to_vec();
        bytes.push(0xE3); // a with tilde in latin-1
        bytes.extend_from_slice(b"o Paulo\nRJ;Niter");
        bytes.push(0xF3);
        bytes.extend_from_slice(b"i\n");
        std::fs::write(&csv, bytes).unwrap();
        let engine = engine().await;

        let report = convert_csv(&engine, &csv, dir.path()).await.unwrap();
        assert_eq!(report.delimiter, Some(';'));
        assert_eq!((report.rows, report.columns), (2, 2));
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine().await;
        let err = convert_csv(&engine, &dir.path().join("nope.csv"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DuckdashError::ReaderError(_)));
        engine.close().await.unwrap();
    }
}
