//! Engine lifecycle: backend selection, the single connection, scratch space

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tempfile::TempDir;

use super::connection::EngineLocation;
use super::{DuckDBReader, Reader, ResultSet};
use crate::{DuckdashError, Result};

/// Execution backend the engine was started with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Multi-threaded execution
    Parallel { threads: usize },
    /// Single worker thread, used when parallel execution is unavailable
    Serial,
}

impl Backend {
    fn threads(&self) -> usize {
        match self {
            Backend::Parallel { threads } => *threads,
            Backend::Serial => 1,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Parallel { threads } => write!(f, "parallel ({} threads)", threads),
            Backend::Serial => write!(f, "serial"),
        }
    }
}

/// Engine settings, read from the `[engine]` table of a dashboard file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Connection string, `duckdb://memory` or `duckdb://<path>`
    pub connection: String,
    /// Worker threads for the parallel backend; defaults to available parallelism
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection: "duckdb://memory".to_string(),
            threads: None,
        }
    }
}

impl EngineConfig {
    fn candidates(&self) -> Vec<Backend> {
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        if threads > 1 {
            vec![Backend::Parallel { threads }, Backend::Serial]
        } else {
            vec![Backend::Serial]
        }
    }
}

/// A ready engine with exactly one open connection.
///
/// Statements run on tokio's blocking pool; callers see each one as a single
/// awaited operation. The handle is not meant to be shared between
/// independent runs.
#[derive(Debug)]
pub struct EngineHandle {
    reader: Arc<Mutex<DuckDBReader>>,
    backend: Backend,
    scratch: TempDir,
}

impl EngineHandle {
    /// Start the best available backend and connect to it
    ///
    /// A file database left by an earlier engine is deleted first.
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::EngineInit` if the connection string is invalid,
    /// the scratch directory cannot be created, or no backend starts.
    pub async fn acquire(config: &EngineConfig) -> Result<Self> {
        let location: EngineLocation = config.connection.parse()?;
        let scratch = tempfile::Builder::new()
            .prefix("duckdash-")
            .tempdir()
            .map_err(|e| {
                DuckdashError::EngineInit(format!("Failed to create scratch directory: {}", e))
            })?;

        let candidates = config.candidates();
        let scratch_path = scratch.path().to_path_buf();
        let (reader, backend) = tokio::task::spawn_blocking(move || {
            open_first_available(&location, &candidates, &scratch_path)
        })
        .await
        .map_err(|e| DuckdashError::EngineInit(format!("Engine start task failed: {}", e)))??;

        tracing::info!("Engine ready: {}", backend);
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            backend,
            scratch,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Directory on the engine's file search path
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Run a row-producing statement
    pub async fn query(&self, sql: &str) -> Result<ResultSet> {
        tracing::debug!("Executing query ({} bytes)", sql.len());
        let sql = sql.to_string();
        self.with_reader(move |reader| reader.execute(&sql)).await
    }

    /// Run one or more side-effecting statements
    pub async fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!("Executing statement ({} bytes)", sql.len());
        let sql = sql.to_string();
        self.with_reader(move |reader| reader.execute_effect(&sql))
            .await
    }

    async fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DuckDBReader) -> Result<T> + Send + 'static,
    {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || {
            let guard = reader
                .lock()
                .map_err(|_| DuckdashError::InternalError("Engine lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| DuckdashError::InternalError(format!("Engine task failed: {}", e)))?
    }

    /// Release the connection and the scratch directory
    pub async fn close(self) -> Result<()> {
        let Self {
            reader, scratch, ..
        } = self;
        tokio::task::spawn_blocking(move || {
            let reader = Arc::try_unwrap(reader)
                .map_err(|_| {
                    DuckdashError::InternalError("Engine still in use at close".to_string())
                })?
                .into_inner()
                .map_err(|_| DuckdashError::InternalError("Engine lock poisoned".to_string()))?;
            reader.close()
        })
        .await
        .map_err(|e| DuckdashError::InternalError(format!("Engine close task failed: {}", e)))??;

        scratch.close()?;
        tracing::info!("Engine closed");
        Ok(())
    }
}

fn open_first_available(
    location: &EngineLocation,
    candidates: &[Backend],
    scratch: &Path,
) -> Result<(DuckDBReader, Backend)> {
    location.reset().map_err(|e| {
        DuckdashError::EngineInit(format!("Failed to reset {}: {}", location, e))
    })?;

    let mut failures = Vec::new();
    for backend in candidates {
        let opened = DuckDBReader::open(location, Some(backend.threads())).and_then(|reader| {
            reader.set_file_search_path(scratch)?;
            Ok(reader)
        });
        match opened {
            Ok(reader) => return Ok((reader, *backend)),
            Err(e) => {
                tracing::warn!("Backend {} unavailable: {}", backend, e);
                failures.push(format!("{}: {}", backend, e));
            }
        }
    }
    Err(DuckdashError::EngineInit(format!(
        "No engine backend could be started ({})",
        failures.join("; ")
    )))
}
