/*!
# duckdash - dashboards over an embedded analytical engine

duckdash loads columnar data files into an in-process DuckDB instance, runs a
fixed chain of SQL steps over them, reshapes every produced result into plain
records and renders those records through a catalogue of interactive charts.

## Example

```toml
title = "NYC yellow taxi, December"
base = "public/parquet"

[[files]]
name = "yellow_tripdata_2018-12.parquet"

[[steps]]
name = "create_taxis"
kind = "effect"
creates = "taxis"
reads = ["yellow_tripdata_2018-12.parquet"]
sql = "CREATE TABLE taxis AS SELECT * FROM read_parquet('yellow_tripdata_2018-12.parquet')"

[[steps]]
name = "daily_counts"
kind = "produce"
reads = ["taxis"]
sql = "SELECT ano, dia_mes, COUNT(*) AS num_corridas FROM taxis GROUP BY ALL ORDER BY ALL"

[[charts]]
target = "vizDaily"
step = "daily_counts"
kind = "time_lines"
series = "ano"
period = "dia_mes"
value = "num_corridas"
```

## Architecture

A run flows through these stages, leaves first:
- [`engine`] - the DuckDB handle (backend selection, single connection, scratch files)
- [`registrar`] - fetches data files and registers them under logical names
- [`pipeline`] - runs the ordered SQL steps, stopping at the first failure
- [`shape`] - coerces result frames into records with plain `f64` numbers
- [`chart`] - scales, binning, correlation, tooltip and scene primitives
- [`catalogue`] - the ten chart renderers built on [`chart`]
- [`diagnostics`] - the human-readable progress and error log
- [`writer`] - presentation adapters (HTML page, JSON payload)

[`dashboard::Session`] wires the stages together for one dataset page.
*/

pub mod catalogue;
pub mod chart;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod diagnostics;
pub mod engine;
pub mod pipeline;
pub mod registrar;
pub mod shape;
pub mod writer;

pub use config::DashboardConfig;
pub use dashboard::Session;
pub use diagnostics::DiagnosticsLog;
pub use engine::{EngineConfig, EngineHandle};
pub use pipeline::{QueryStep, StepKind};
pub use shape::{ResultRecord, ShapedResult, Value};

// Result frames are polars DataFrames
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum DuckdashError {
    #[error("Engine initialization error: {0}")]
    EngineInit(String),

    #[error("Failed to register file '{name}': {cause}")]
    FileRegistration { name: String, cause: String },

    #[error("Query step '{step}' failed: {message}")]
    Query { step: String, message: String },

    #[error("Shaping error in column '{column}': {message}")]
    Shaping { column: String, message: String },

    #[error("Render error in chart '{chart}': {message}")]
    Render { chart: String, message: String },

    #[error("Data source error: {0}")]
    ReaderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output generation error: {0}")]
    WriterError(String),

    #[error("A pipeline run is already in progress")]
    RunInProgress,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DuckdashError {
    /// Whether this error aborts a whole run (as opposed to one chart or one value).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Shaping { .. } | Self::Render { .. })
    }
}

pub type Result<T> = std::result::Result<T, DuckdashError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
