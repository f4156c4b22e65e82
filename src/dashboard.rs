//! One dataset page: engine, pipeline, diagnostics and charts wired together
//!
//! A [`Session`] owns everything a run produces. Starting a run discards the
//! previous run's engine (tables, connection, scratch files) and log before
//! bootstrapping again; at most one run is active at a time, and the busy
//! flag is released by a drop guard whether the run succeeds or fails.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::catalogue::{render_chart, ChartKind, RenderContext};
use crate::chart::geo::GeoCollection;
use crate::chart::ChartArea;
use crate::config::DashboardConfig;
use crate::diagnostics::{format_summary, DiagnosticsLog};
use crate::engine::EngineHandle;
use crate::pipeline::{ProgressEvent, ProgressSink, QueryOrchestrator};
use crate::registrar::FileRegistrar;
use crate::shape::ShapedResult;
use crate::writer::Page;
use crate::{DuckdashError, Result};

/// Shared busy flag; clones observe the same session
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    busy: Arc<AtomicBool>,
}

impl RunControl {
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Mark a run as started
    ///
    /// # Errors
    ///
    /// Returns `DuckdashError::RunInProgress` if a run is already active.
    pub fn try_begin(&self) -> Result<RunGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DuckdashError::RunInProgress)?;
        Ok(RunGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

/// Clears the busy flag when dropped
#[derive(Debug)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Forwards progress to the caller and into the session log
struct Tee<'a> {
    log: &'a mut DiagnosticsLog,
    sink: &'a mut (dyn ProgressSink + Send),
}

impl ProgressSink for Tee<'_> {
    fn report(&mut self, event: ProgressEvent) {
        self.log.report(event.clone());
        self.sink.report(event);
    }
}

#[derive(Debug)]
pub struct Session {
    config: DashboardConfig,
    control: RunControl,
    engine: Option<EngineHandle>,
    /// Loaded once and kept across runs
    geometry: Option<GeoCollection>,
    log: DiagnosticsLog,
    areas: Vec<ChartArea>,
    outputs: BTreeMap<String, ShapedResult>,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        let areas = config.charts.iter().map(|c| c.new_area()).collect();
        Self {
            config,
            control: RunControl::default(),
            engine: None,
            geometry: None,
            log: DiagnosticsLog::new(),
            areas,
            outputs: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn log(&self) -> &DiagnosticsLog {
        &self.log
    }

    pub fn areas(&self) -> &[ChartArea] {
        &self.areas
    }

    pub fn area(&self, id: &str) -> Option<&ChartArea> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// Shaped results of the last run, by step name
    pub fn outputs(&self) -> &BTreeMap<String, ShapedResult> {
        &self.outputs
    }

    pub fn page(&self) -> Page<'_> {
        Page::new(&self.config.title, &self.log, &self.areas)
    }

    /// Run the whole pipeline and render every chart
    ///
    /// Fatal errors (engine, registration, query) end the run and are
    /// returned after being written to the log. Shaping warnings and chart
    /// failures are logged and the run carries on.
    pub async fn run(&mut self, sink: &mut (dyn ProgressSink + Send)) -> Result<()> {
        let _guard = self.control.try_begin()?;

        self.log.clear();
        self.outputs.clear();
        for area in &mut self.areas {
            area.clear();
        }

        let result = self.run_pipeline(sink).await;
        match &result {
            Ok(()) => {
                self.log.info("Analysis complete");
                sink.report(ProgressEvent::Status("Analysis complete".to_string()));
            }
            Err(e) => {
                tracing::error!("Run failed: {}", e);
                self.log.error(e.to_string());
            }
        }
        result
    }

    async fn run_pipeline(&mut self, sink: &mut (dyn ProgressSink + Send)) -> Result<()> {
        if let Some(previous) = self.engine.take() {
            self.status(sink, "Closing previous engine...");
            if let Err(e) = previous.close().await {
                tracing::warn!("Failed to close previous engine: {}", e);
            }
        }

        self.status(sink, "Starting engine...");
        let engine = EngineHandle::acquire(&self.config.engine).await?;
        self.status(sink, &format!("Engine ready ({})", engine.backend()));

        let sources = self.config.sources();
        self.status(sink, &format!("Registering {} file(s)...", sources.len()));
        let registrar = FileRegistrar::new(Duration::from_secs(self.config.fetch_timeout_secs))?;
        let registered = registrar.register_all(&engine, &sources).await;
        // Keep the engine so the next run can close it
        let engine = &*self.engine.insert(engine);
        registered?;

        let orchestrator =
            QueryOrchestrator::new(engine, sources.iter().map(|s| s.name.as_str()));
        let outputs = {
            let mut tee = Tee {
                log: &mut self.log,
                sink: &mut *sink,
            };
            orchestrator.run(&self.config.steps, &mut tee).await?
        };

        for output in outputs {
            for warning in &output.result.warnings {
                tracing::warn!("{}: {}", output.step, warning);
                self.log.warn(warning.to_string());
            }
            self.outputs.insert(output.step, output.result);
        }

        if let Some(diagnostic) = &self.config.diagnostic {
            let records = self
                .outputs
                .get(&diagnostic.step)
                .map(|r| r.records.as_slice())
                .unwrap_or(&[]);
            self.log.info(format_summary(records, &diagnostic.fields));
        }

        self.load_geometry(&registrar).await;
        self.render_all();
        Ok(())
    }

    fn status(&mut self, sink: &mut (dyn ProgressSink + Send), message: &str) {
        tracing::info!("{}", message);
        self.log.info(message);
        sink.report(ProgressEvent::Status(message.to_string()));
    }

    /// Fetch region geometry if a choropleth needs it and it is not cached.
    /// A failure is logged; the choropleths then fail individually.
    async fn load_geometry(&mut self, registrar: &FileRegistrar) {
        let needed = self
            .config
            .charts
            .iter()
            .any(|c| matches!(c.kind, ChartKind::Choropleth(_)));
        if !needed || self.geometry.is_some() {
            return;
        }
        let (Some(location), Some(geometry)) =
            (self.config.geometry_location(), self.config.geometry.as_ref())
        else {
            return;
        };

        let loaded = match registrar.fetch_location("geometry", &location).await {
            Ok(bytes) => GeoCollection::from_json(&bytes, geometry.id_property.as_deref()),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(collection) => {
                tracing::info!("Loaded {} regions", collection.features.len());
                self.geometry = Some(collection);
            }
            Err(e) => {
                tracing::warn!("Geometry unavailable: {}", e);
                self.log.error(e.to_string());
            }
        }
    }

    fn render_all(&mut self) {
        let ctx = RenderContext {
            geometry: self.geometry.as_ref(),
        };
        for (chart, area) in self.config.charts.iter().zip(self.areas.iter_mut()) {
            let records = self
                .outputs
                .get(&chart.step)
                .map(|r| r.records.as_slice())
                .unwrap_or(&[]);
            if let Err(e) = render_chart(chart, records, &ctx, area) {
                tracing::warn!("Chart {} failed: {}", chart.target, e);
                self.log.error(e.to_string());
            }
        }
    }

    /// Release the engine of the last run
    pub async fn close(&mut self) -> Result<()> {
        match self.engine.take() {
            Some(engine) => engine.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::AreaStatus;
    use crate::diagnostics::Severity;

    fn dashboard(dir: &std::path::Path, extra_step: &str) -> DashboardConfig {
        std::fs::write(
            dir.join("scores.csv"),
            "escola,nota\nPublic,480.5\nPublic,520\nPrivate,610\nPrivate,abc\n",
        )
        .unwrap();
        let text = format!(
            r#"
            title = "Scores"
            base = "{base}"

            [engine]
            threads = 1

            [[files]]
            name = "scores.csv"

            [[steps]]
            name = "create_scores"
            kind = "effect"
            creates = "scores"
            reads = ["scores.csv"]
            sql = "CREATE TABLE scores AS SELECT escola, CAST(nota AS VARCHAR) AS nota FROM read_csv_auto('scores.csv', all_varchar = true)"

            [[steps]]
            name = "by_school"
            kind = "produce"
            reads = ["scores"]
            sql = "SELECT escola, nota FROM scores ORDER BY escola, nota"
            shape = {{ numbers = ["nota"] }}
            {extra_step}

            [[charts]]
            target = "vizSchools"
            step = "by_school"
            kind = "ranked_bars"
            label = "escola"
            value = "nota"

            [[charts]]
            target = "vizBroken"
            step = "by_school"
            kind = "pie"
            label = "missing_column"
            value = "nota"
            "#,
            base = dir.display(),
            extra_step = extra_step
        );
        DashboardConfig::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_run_renders_and_contains_chart_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dashboard(dir.path(), ""));
        let mut events: Vec<ProgressEvent> = Vec::new();
        session.run(&mut events).await.unwrap();

        assert_eq!(session.area("vizSchools").unwrap().status, AreaStatus::Rendered);
        assert!(matches!(
            session.area("vizBroken").unwrap().status,
            AreaStatus::Failed(_)
        ));
        let text = session.log().render_text();
        assert!(text.contains("Warning: "));
        assert!(text.contains("missing_column"));
        assert!(text.ends_with("Analysis complete"));
        assert!(matches!(events.last(), Some(ProgressEvent::Status(s)) if s == "Analysis complete"));
        assert_eq!(session.outputs()["by_school"].len(), 4);
        assert!(!session.control().is_running());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rerun_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dashboard(dir.path(), ""));
        let mut events: Vec<ProgressEvent> = Vec::new();
        session.run(&mut events).await.unwrap();
        let first = session.log().entries().len();
        // A second run would fail on CREATE TABLE if the old tables survived
        session.run(&mut events).await.unwrap();
        assert_eq!(session.log().entries().len(), first + 1);
        assert!(session.log().render_text().starts_with("Closing previous engine..."));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_backed_rerun_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = dashboard(dir.path(), "");
        config.engine.connection = format!("duckdb://{}", dir.path().join("dash.db").display());
        let mut session = Session::new(config);
        let mut events: Vec<ProgressEvent> = Vec::new();

        session.run(&mut events).await.unwrap();
        session.run(&mut events).await.unwrap();
        assert_eq!(session.outputs()["by_school"].len(), 4);
        assert!(!session.log().render_text().contains("already exists"));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_step_is_logged_and_releases_control() {
        let dir = tempfile::tempdir().unwrap();
        let broken = r#"
            [[steps]]
            name = "broken"
            kind = "produce"
            sql = "SELECT * FROM no_such_table"
        "#;
        let mut session = Session::new(dashboard(dir.path(), broken));
        let mut events: Vec<ProgressEvent> = Vec::new();
        let err = session.run(&mut events).await.unwrap_err();

        assert!(matches!(err, DuckdashError::Query { ref step, .. } if step == "broken"));
        let errors: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Query step 'broken' failed"));
        assert!(!session.control().is_running());
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::StepFailed { .. })));
        session.close().await.unwrap();
    }

    #[test]
    fn test_second_begin_is_rejected() {
        let control = RunControl::default();
        let guard = control.try_begin().unwrap();
        assert!(matches!(control.try_begin(), Err(DuckdashError::RunInProgress)));
        drop(guard);
        assert!(control.try_begin().is_ok());
    }
}
