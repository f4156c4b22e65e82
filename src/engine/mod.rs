//! Embedded engine access layer
//!
//! The engine module wraps the in-process DuckDB database used by a dashboard run.
//!
//! # Architecture
//!
//! - [`Reader`] is the synchronous seam: SQL text in, [`ResultSet`] out.
//!   [`DuckDBReader`] is its only implementation.
//! - [`EngineHandle`] owns one reader (one connection) behind a mutex and runs
//!   every statement on a blocking thread, so async callers observe each
//!   statement as a single awaited operation.
//!
//! # Example
//!
//! ```rust,ignore
//! use duckdash::engine::{EngineConfig, EngineHandle};
//!
//! let engine = EngineHandle::acquire(&EngineConfig::default()).await?;
//! let result = engine.query("SELECT 42 AS answer").await?;
//! engine.close().await?;
//! ```

use std::collections::BTreeSet;

use crate::{DataFrame, Result};

pub mod connection;
pub mod duckdb;
pub mod handle;

pub use self::duckdb::DuckDBReader;
pub use connection::EngineLocation;
pub use handle::{Backend, EngineConfig, EngineHandle};

/// A materialized query result.
///
/// Wide numeric engine types (DECIMAL, HUGEINT, UBIGINT) have no lossless
/// counterpart among the frame's column types. They travel as their exact
/// decimal text and are listed in `wide_numeric` so the shaper can coerce them.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub frame: DataFrame,
    pub wide_numeric: BTreeSet<String>,
}

impl ResultSet {
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            wide_numeric: BTreeSet::new(),
        }
    }

    /// Number of rows in the result
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Column names in engine order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Trait for engine readers
///
/// Readers execute SQL text. Statements that produce rows go through
/// [`Reader::execute`]; statements that only change engine state (CREATE,
/// INSERT, SET, ...) go through [`Reader::execute_effect`].
pub trait Reader {
    /// Execute a row-producing SQL statement
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::ReaderError` if:
    /// - The SQL is invalid
    /// - A referenced table or file doesn't exist
    /// - A value cannot be read from the engine
    fn execute(&self, sql: &str) -> Result<ResultSet>;

    /// Execute one or more side-effecting statements, discarding any rows
    fn execute_effect(&self, sql: &str) -> Result<()>;
}
