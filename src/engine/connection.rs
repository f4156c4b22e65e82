//! Where the engine keeps its database
//!
//! Dashboards name the database with a `duckdb://` string. Almost every run
//! uses `duckdb://memory`. A file location moves the database out of memory
//! for large derived tables; it is still emptied whenever an engine is
//! acquired, so every run starts without tables.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use crate::DuckdashError;

const SCHEME: &str = "duckdb://";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineLocation {
    #[default]
    Memory,
    File(PathBuf),
}

impl EngineLocation {
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Delete a file database and its write-ahead log, if present
    pub fn reset(&self) -> io::Result<()> {
        let Self::File(path) = self else {
            return Ok(());
        };
        let mut wal = path.clone().into_os_string();
        wal.push(".wal");
        for file in [path.clone(), PathBuf::from(wal)] {
            match std::fs::remove_file(&file) {
                Ok(()) => tracing::debug!("Removed {}", file.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl FromStr for EngineLocation {
    type Err = DuckdashError;

    /// `duckdb://memory` (or `duckdb://:memory:`), `duckdb://relative.db` and
    /// `duckdb:///absolute/path.db`.
    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
            DuckdashError::EngineInit(format!(
                "Engine location must start with {}: {}",
                SCHEME, uri
            ))
        })?;

        match rest {
            "memory" | ":memory:" => Ok(Self::Memory),
            _ if rest.trim_start_matches('/').is_empty() => Err(DuckdashError::EngineInit(
                format!("Engine location has no database file: {}", uri),
            )),
            // `duckdb:///tmp/x.db` keeps one leading slash
            _ if rest.starts_with('/') => Ok(Self::File(PathBuf::from(format!(
                "/{}",
                rest.trim_start_matches('/')
            )))),
            _ => Ok(Self::File(PathBuf::from(rest))),
        }
    }
}

impl fmt::Display for EngineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "{}memory", SCHEME),
            Self::File(path) => write!(f, "{}{}", SCHEME, path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_spellings() {
        for uri in ["duckdb://memory", "duckdb://:memory:"] {
            assert_eq!(uri.parse::<EngineLocation>().unwrap(), EngineLocation::Memory);
        }
        assert!(EngineLocation::default().is_memory());
    }

    #[test]
    fn test_file_locations() {
        assert_eq!(
            "duckdb://dashboards/taxi.db".parse::<EngineLocation>().unwrap(),
            EngineLocation::File(PathBuf::from("dashboards/taxi.db"))
        );
        let absolute: EngineLocation = "duckdb:///tmp/taxi.db".parse().unwrap();
        assert_eq!(absolute, EngineLocation::File(PathBuf::from("/tmp/taxi.db")));
        assert_eq!(absolute.to_string(), "duckdb:///tmp/taxi.db");
    }

    #[test]
    fn test_reset_removes_database_and_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.db");
        std::fs::write(&db, b"stale").unwrap();
        std::fs::write(dir.path().join("dash.db.wal"), b"stale").unwrap();

        let location = EngineLocation::File(db.clone());
        location.reset().unwrap();
        assert!(!db.exists());
        assert!(!dir.path().join("dash.db.wal").exists());
        // Nothing left to remove is fine
        location.reset().unwrap();
        EngineLocation::Memory.reset().unwrap();
    }

    #[test]
    fn test_rejected_locations() {
        assert!("duckdb://".parse::<EngineLocation>().is_err());
        assert!("duckdb:///".parse::<EngineLocation>().is_err());
        let err = "postgres://localhost/db".parse::<EngineLocation>().unwrap_err();
        assert!(matches!(err, DuckdashError::EngineInit(_)));
    }
}
