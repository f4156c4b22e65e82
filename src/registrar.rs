//! Data file registration
//!
//! Makes columnar files addressable from SQL under a logical name. A source is
//! either fetched eagerly into the engine's scratch directory (`buffer`) or
//! left where it is and read by the engine on first access (`url`). In both
//! modes a view named after the logical name is created, so steps may use
//! either `FROM "name"` or `read_parquet('name')`.

use std::time::Duration;

use serde::Deserialize;

use crate::engine::duckdb::sql_string_literal;
use crate::engine::EngineHandle;
use crate::{DuckdashError, Result};

/// How a source is handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Fetch the full file up front
    #[default]
    Buffer,
    /// Register the location only
    Url,
}

/// File format, derived from the logical name's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Parquet,
    Csv,
    Json,
}

impl FileFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let ext = lower.rsplit('.').next()?;
        match ext {
            "parquet" | "pq" => Some(FileFormat::Parquet),
            "csv" | "tsv" => Some(FileFormat::Csv),
            "json" | "ndjson" | "jsonl" => Some(FileFormat::Json),
            _ => None,
        }
    }

    /// DuckDB table function reading this format
    pub fn reader_function(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "read_parquet",
            FileFormat::Csv => "read_csv_auto",
            FileFormat::Json => "read_json_auto",
        }
    }
}

/// Where the bytes of a source come from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOrigin {
    /// Already in memory
    Bytes(Vec<u8>),
    /// An `http(s)://` URL, a `file://` URL or a local path
    Location(String),
}

/// A file to register under a logical name
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub origin: SourceOrigin,
    pub mode: RegistrationMode,
}

impl DataSource {
    /// A location fetched in full at registration time
    pub fn buffer(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::Location(location.into()),
            mode: RegistrationMode::Buffer,
        }
    }

    /// A location the engine reads lazily
    pub fn url(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::Location(location.into()),
            mode: RegistrationMode::Url,
        }
    }

    /// Bytes already held in memory
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::Bytes(bytes),
            mode: RegistrationMode::Buffer,
        }
    }

    fn format(&self) -> Result<FileFormat> {
        FileFormat::from_name(&self.name).ok_or_else(|| self.failure("unrecognized file extension"))
    }

    fn failure(&self, cause: impl std::fmt::Display) -> DuckdashError {
        DuckdashError::FileRegistration {
            name: self.name.clone(),
            cause: cause.to_string(),
        }
    }
}

fn validate_name(source: &DataSource) -> Result<()> {
    if source.name.trim().is_empty() {
        return Err(source.failure("logical name is empty"));
    }
    if source
        .name
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '"' | '\''))
    {
        return Err(source.failure("logical name may not contain path separators or quotes"));
    }
    Ok(())
}

/// Fetches data files and registers them with an engine
#[derive(Debug, Clone)]
pub struct FileRegistrar {
    client: reqwest::Client,
}

impl FileRegistrar {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DuckdashError::InternalError(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }

    /// Register one source
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::FileRegistration` on a non-2xx response, a
    /// network failure, a missing local file or an engine refusal.
    pub async fn register(&self, engine: &EngineHandle, source: &DataSource) -> Result<()> {
        validate_name(source)?;
        let format = source.format()?;

        let path = match (&source.mode, &source.origin) {
            (RegistrationMode::Url, SourceOrigin::Location(location)) => location.clone(),
            (RegistrationMode::Url, SourceOrigin::Bytes(_)) => {
                return Err(source.failure("url mode needs a location, not bytes"));
            }
            (RegistrationMode::Buffer, origin) => {
                let bytes = match origin {
                    SourceOrigin::Bytes(bytes) => bytes.clone(),
                    SourceOrigin::Location(location) => self.fetch(source, location).await?,
                };
                let target = engine.scratch_dir().join(&source.name);
                tokio::fs::write(&target, &bytes)
                    .await
                    .map_err(|e| source.failure(format!("cannot write buffer: {}", e)))?;
                tracing::debug!("Buffered {} ({} bytes)", source.name, bytes.len());
                target.to_string_lossy().into_owned()
            }
        };

        let sql = format!(
            "CREATE OR REPLACE VIEW \"{}\" AS SELECT * FROM {}('{}')",
            source.name,
            format.reader_function(),
            sql_string_literal(&path)
        );
        // Views bind lazily; the engine reads url sources on first use
        engine
            .execute(&sql)
            .await
            .map_err(|e| source.failure(e))?;

        tracing::info!("Registered {} ({:?})", source.name, source.mode);
        Ok(())
    }

    /// Register every source; all must succeed before any step runs
    pub async fn register_all(&self, engine: &EngineHandle, sources: &[DataSource]) -> Result<()> {
        for source in sources {
            self.register(engine, source).await?;
        }
        Ok(())
    }

    /// Read a location in full without registering it
    pub async fn fetch_location(&self, name: &str, location: &str) -> Result<Vec<u8>> {
        let source = DataSource::buffer(name, location);
        self.fetch(&source, location).await
    }

    async fn fetch(&self, source: &DataSource, location: &str) -> Result<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .map_err(|e| source.failure(e))?
                .error_for_status()
                .map_err(|e| source.failure(e))?;
            let bytes = response.bytes().await.map_err(|e| source.failure(e))?;
            Ok(bytes.to_vec())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            tokio::fs::read(path)
                .await
                .map_err(|e| source.failure(format!("{}: {}", path, e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    fn registrar() -> FileRegistrar {
        FileRegistrar::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(
            FileFormat::from_name("yellow_tripdata_2018-12.parquet"),
            Some(FileFormat::Parquet)
        );
        assert_eq!(FileFormat::from_name("MICRODADOS.CSV"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_name("brasil.json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_name("notes.txt"), None);
    }

    #[tokio::test]
    async fn test_register_bytes_buffer() {
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let csv = b"a,b\n1,x\n2,y\n3,z\n".to_vec();
        registrar()
            .register(&engine, &DataSource::bytes("small.csv", csv))
            .await
            .unwrap();

        let by_view = engine.query("SELECT * FROM \"small.csv\"").await.unwrap();
        assert_eq!(by_view.height(), 3);
        let by_function = engine
            .query("SELECT * FROM read_csv_auto('small.csv')")
            .await
            .unwrap();
        assert_eq!(by_function.height(), 3);
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_register_local_file_in_url_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        std::fs::write(&path, "x,y\n1,2\n3,4\n").unwrap();

        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        registrar()
            .register(
                &engine,
                &DataSource::url("points.csv", path.to_string_lossy()),
            )
            .await
            .unwrap();
        let result = engine.query("SELECT SUM(x) AS s FROM \"points.csv\"").await.unwrap();
        assert_eq!(result.height(), 1);
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_local_file_is_registration_error() {
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let err = registrar()
            .register(
                &engine,
                &DataSource::buffer("gone.parquet", "/definitely/not/here/gone.parquet"),
            )
            .await
            .unwrap_err();
        match err {
            DuckdashError::FileRegistration { name, .. } => assert_eq!(name, "gone.parquet"),
            other => panic!("unexpected error: {other}"),
        }
        engine.close().await.unwrap();
    }

    /// Answer a single HTTP request with `status` and `body`; returns the URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/data", addr)
    }

    #[tokio::test]
    async fn test_http_buffer_fetch() {
        let url = serve_once("200 OK", "uf,n\nSP,3\nRJ,2\n").await;
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        registrar()
            .register(&engine, &DataSource::buffer("states.csv", url))
            .await
            .unwrap();
        let result = engine.query("SELECT * FROM \"states.csv\"").await.unwrap();
        assert_eq!(result.height(), 2);
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_http_not_found_is_registration_error() {
        let url = serve_once("404 Not Found", "").await;
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let err = registrar()
            .register(&engine, &DataSource::buffer("yellow_tripdata_2018-12.parquet", url))
            .await
            .unwrap_err();
        match err {
            DuckdashError::FileRegistration { name, cause } => {
                assert_eq!(name, "yellow_tripdata_2018-12.parquet");
                assert!(cause.contains("404"), "{}", cause);
            }
            other => panic!("unexpected error: {other}"),
        }
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_is_registration_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let err = registrar()
            .register(
                &engine,
                &DataSource::buffer("RESULTADOS_2024.parquet", format!("http://{}/x", addr)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DuckdashError::FileRegistration { ref name, .. } if name == "RESULTADOS_2024.parquet"
        ));
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_name_with_quote_rejected() {
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let err = registrar()
            .register(&engine, &DataSource::bytes("bad\".csv", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DuckdashError::FileRegistration { .. }));
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_extension_rejected() {
        let engine = EngineHandle::acquire(&EngineConfig::default()).await.unwrap();
        let err = registrar()
            .register(&engine, &DataSource::bytes("notes.txt", b"hi".to_vec()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
        engine.close().await.unwrap();
    }
}
