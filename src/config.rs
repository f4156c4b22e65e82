//! Dashboard configuration
//!
//! A dashboard is one TOML file: where its data files live, the engine to
//! run on, the ordered SQL steps, the diagnostic summary and the charts.
//! Dataset-specific SQL lives here rather than in code.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::catalogue::ChartConfig;
use crate::diagnostics::SummaryFields;
use crate::engine::EngineConfig;
use crate::pipeline::{QueryStep, StepKind};
use crate::registrar::{DataSource, RegistrationMode};
use crate::{DuckdashError, Result};

fn default_title() -> String {
    "Dashboard".to_string()
}

fn default_base() -> String {
    ".".to_string()
}

fn default_fetch_timeout() -> u64 {
    60
}

/// A data file to register
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileEntry {
    /// Logical name, also the file name under `base`
    pub name: String,
    #[serde(default)]
    pub mode: RegistrationMode,
    /// Explicit location overriding `base/name`
    #[serde(default)]
    pub location: Option<String>,
}

/// Region boundaries for choropleth charts
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeometryConfig {
    pub location: String,
    /// Feature property holding the region id; the feature `id` otherwise
    #[serde(default)]
    pub id_property: Option<String>,
}

/// Which produce step feeds the summary block, and its column names
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosticConfig {
    pub step: String,
    #[serde(default)]
    pub fields: SummaryFields,
}

/// One dataset page
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Directory or URL prefix file names are resolved against
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub geometry: Option<GeometryConfig>,
    #[serde(default)]
    pub steps: Vec<QueryStep>,
    #[serde(default)]
    pub diagnostic: Option<DiagnosticConfig>,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
}

impl DashboardConfig {
    /// Parse and validate a dashboard from TOML text
    pub fn from_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| DuckdashError::ConfigError(format!("Invalid dashboard: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a dashboard file
    ///
    /// A relative `base` is taken relative to the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DuckdashError::ConfigError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_str(&text)?;
        if !is_url(&config.base) && Path::new(&config.base).is_relative() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            config.base = dir.join(&config.base).to_string_lossy().into_owned();
        }
        Ok(config)
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Check what can be checked without an engine
    ///
    /// Step ordering is validated again before a run, against the names
    /// actually registered.
    pub fn validate(&self) -> Result<()> {
        let mut files = HashSet::new();
        for file in &self.files {
            if !files.insert(file.name.to_lowercase()) {
                return Err(DuckdashError::ConfigError(format!(
                    "File '{}' is listed twice",
                    file.name
                )));
            }
        }

        let target_pattern = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$")
            .map_err(|e| DuckdashError::InternalError(e.to_string()))?;
        let mut targets = HashSet::new();
        for chart in &self.charts {
            if !target_pattern.is_match(&chart.target) {
                return Err(DuckdashError::ConfigError(format!(
                    "Chart target '{}' is not a valid area id",
                    chart.target
                )));
            }
            if !targets.insert(chart.target.as_str()) {
                return Err(DuckdashError::ConfigError(format!(
                    "Chart target '{}' is used twice",
                    chart.target
                )));
            }
            self.require_produce_step(&chart.step, &format!("Chart '{}'", chart.target))?;
            if chart.kind.name() == "choropleth" && self.geometry.is_none() {
                return Err(DuckdashError::ConfigError(format!(
                    "Chart '{}' is a choropleth but no geometry is configured",
                    chart.target
                )));
            }
        }

        if let Some(diagnostic) = &self.diagnostic {
            self.require_produce_step(&diagnostic.step, "Diagnostic summary")?;
        }
        Ok(())
    }

    fn require_produce_step(&self, name: &str, owner: &str) -> Result<()> {
        match self.steps.iter().find(|s| s.name == name) {
            Some(step) if step.kind == StepKind::Produce => Ok(()),
            Some(_) => Err(DuckdashError::ConfigError(format!(
                "{} uses step '{}', which returns no rows",
                owner, name
            ))),
            None => Err(DuckdashError::ConfigError(format!(
                "{} uses unknown step '{}'",
                owner, name
            ))),
        }
    }

    /// Data sources with locations resolved against `base`
    pub fn sources(&self) -> Vec<DataSource> {
        self.files
            .iter()
            .map(|file| {
                let location = file
                    .location
                    .clone()
                    .unwrap_or_else(|| resolve(&self.base, &file.name));
                match file.mode {
                    RegistrationMode::Buffer => DataSource::buffer(&file.name, location),
                    RegistrationMode::Url => DataSource::url(&file.name, location),
                }
            })
            .collect()
    }

    /// Geometry location resolved against `base`
    pub fn geometry_location(&self) -> Option<String> {
        self.geometry
            .as_ref()
            .map(|g| resolve(&self.base, &g.location))
    }
}

fn is_url(location: &str) -> bool {
    location.contains("://")
}

/// Join a relative location onto a directory or URL prefix
pub fn resolve(base: &str, location: &str) -> String {
    if is_url(location) || Path::new(location).is_absolute() {
        return location.to_string();
    }
    if is_url(base) {
        format!("{}/{}", base.trim_end_matches('/'), location)
    } else {
        let joined: PathBuf = Path::new(base).join(location);
        joined.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::SourceOrigin;

    const DASHBOARD: &str = r#"
        title = "Taxi"
        base = "https://example.org/parquet/"

        [engine]
        threads = 2

        [[files]]
        name = "trips.parquet"

        [[files]]
        name = "zones.csv"
        mode = "url"

        [[steps]]
        name = "create_trips"
        kind = "effect"
        creates = "trips"
        reads = ["trips.parquet"]
        sql = "CREATE TABLE trips AS SELECT * FROM read_parquet('trips.parquet')"

        [[steps]]
        name = "summary"
        kind = "produce"
        reads = ["trips"]
        sql = "SELECT COUNT(*) AS total_rows FROM trips"

        [diagnostic]
        step = "summary"

        [[charts]]
        target = "vizZones"
        step = "summary"
        kind = "ranked_bars"
        label = "zone"
        value = "total_rows"
    "#;

    #[test]
    fn test_parse_dashboard() {
        let config = DashboardConfig::from_str(DASHBOARD).unwrap();
        assert_eq!(config.title, "Taxi");
        assert_eq!(config.engine.threads, Some(2));
        assert_eq!(config.fetch_timeout_secs, 60);
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.diagnostic.as_ref().unwrap().fields.total_rows, "total_rows");

        let sources = config.sources();
        assert_eq!(
            sources[0].origin,
            SourceOrigin::Location("https://example.org/parquet/trips.parquet".to_string())
        );
        assert_eq!(sources[1].mode, RegistrationMode::Url);
    }

    #[test]
    fn test_chart_on_effect_step_rejected() {
        let text = DASHBOARD.replace(r#"step = "summary"
        kind = "ranked_bars""#, r#"step = "create_trips"
        kind = "ranked_bars""#);
        let err = DashboardConfig::from_str(&text).unwrap_err();
        assert!(err.to_string().contains("returns no rows"));
    }

    #[test]
    fn test_bad_target_rejected() {
        let text = DASHBOARD.replace("vizZones", "viz zones");
        assert!(matches!(
            DashboardConfig::from_str(&text),
            Err(DuckdashError::ConfigError(_))
        ));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("https://h/p", "a.parquet"), "https://h/p/a.parquet");
        assert_eq!(resolve("https://h/p", "file:///x.parquet"), "file:///x.parquet");
        assert_eq!(resolve("/data", "a.parquet"), "/data/a.parquet");
        assert_eq!(resolve("/data", "/abs/a.parquet"), "/abs/a.parquet");
    }

    #[test]
    fn test_from_file_resolves_relative_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.toml");
        std::fs::write(&path, "base = \"data\"\n[[files]]\nname = \"a.csv\"\n").unwrap();
        let config = DashboardConfig::from_file(&path).unwrap();
        let expected = dir.path().join("data").join("a.csv");
        assert_eq!(
            config.sources()[0].origin,
            SourceOrigin::Location(expected.to_string_lossy().into_owned())
        );
    }
}
