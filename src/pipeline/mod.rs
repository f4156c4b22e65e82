//! Query orchestration
//!
//! A run is an ordered list of [`QueryStep`]s executed one at a time on the
//! engine's single connection. Effect steps change engine state (typically
//! `CREATE TABLE`), produce steps return rows that are shaped into records.
//! Each step declares the tables it reads so the order can be checked before
//! anything executes; the first failing step stops the run.

use std::collections::HashSet;
use std::time::Instant;

use serde::Deserialize;

use crate::engine::EngineHandle;
use crate::shape::{shape, ShapeSchema, ShapedResult};
use crate::{DuckdashError, Result};

pub mod progress;

pub use progress::{ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Changes engine state, no rows expected
    Effect,
    /// Returns rows
    Produce,
}

/// One SQL statement in a run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryStep {
    pub name: String,
    pub sql: String,
    pub kind: StepKind,
    /// Registered files or earlier tables this step reads
    #[serde(default)]
    pub reads: Vec<String>,
    /// Table this step creates, made available to later steps
    #[serde(default)]
    pub creates: Option<String>,
    #[serde(default)]
    pub shape: ShapeSchema,
}

impl QueryStep {
    pub fn effect(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            kind: StepKind::Effect,
            reads: Vec::new(),
            creates: None,
            shape: ShapeSchema::default(),
        }
    }

    pub fn produce(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Produce,
            ..Self::effect(name, sql)
        }
    }

    pub fn with_reads<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn creating(mut self, table: impl Into<String>) -> Self {
        self.creates = Some(table.into());
        self
    }

    pub fn with_shape(mut self, shape: ShapeSchema) -> Self {
        self.shape = shape;
        self
    }
}

/// Shaped rows of one produce step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub step: String,
    pub result: ShapedResult,
}

/// Runs steps against one engine
pub struct QueryOrchestrator<'a> {
    engine: &'a EngineHandle,
    known_tables: HashSet<String>,
}

impl<'a> QueryOrchestrator<'a> {
    /// `known_tables` are the logical names registered before the run
    pub fn new<I, S>(engine: &'a EngineHandle, known_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            engine,
            known_tables: known_tables
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Check step names and dependency order without executing anything
    pub fn validate(&self, steps: &[QueryStep]) -> Result<()> {
        let mut available = self.known_tables.clone();
        let mut names = HashSet::new();

        for step in steps {
            if step.name.trim().is_empty() {
                return Err(DuckdashError::ValidationError(
                    "Query step with empty name".to_string(),
                ));
            }
            if !names.insert(step.name.as_str()) {
                return Err(DuckdashError::ValidationError(format!(
                    "Duplicate query step name '{}'",
                    step.name
                )));
            }
            for table in &step.reads {
                if !available.contains(&table.to_lowercase()) {
                    return Err(DuckdashError::ValidationError(format!(
                        "Step '{}' reads '{}', which is neither registered nor created by an earlier step",
                        step.name, table
                    )));
                }
            }
            if let Some(table) = &step.creates {
                available.insert(table.to_lowercase());
            }
        }
        Ok(())
    }

    /// Execute `steps` in order, stopping at the first failure
    ///
    /// Effect steps yield no output. The returned outputs are in step order.
    pub async fn run(
        &self,
        steps: &[QueryStep],
        sink: &mut (dyn ProgressSink + Send),
    ) -> Result<Vec<StepOutput>> {
        self.validate(steps)?;

        let total = steps.len();
        let mut outputs = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            sink.report(ProgressEvent::StepStarted {
                index,
                total,
                name: step.name.clone(),
            });
            tracing::info!("Running step {} ({}/{})", step.name, index + 1, total);
            let started = Instant::now();

            let rows = match self.run_step(step).await {
                Ok(Some(result)) => {
                    let rows = result.len();
                    outputs.push(StepOutput {
                        step: step.name.clone(),
                        result,
                    });
                    Some(rows)
                }
                Ok(None) => None,
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!("Step {} failed: {}", step.name, message);
                    sink.report(ProgressEvent::StepFailed {
                        index,
                        total,
                        name: step.name.clone(),
                        message: message.clone(),
                    });
                    return Err(DuckdashError::Query {
                        step: step.name.clone(),
                        message,
                    });
                }
            };

            sink.report(ProgressEvent::StepFinished {
                index,
                total,
                name: step.name.clone(),
                rows,
                elapsed: started.elapsed(),
            });
        }

        Ok(outputs)
    }

    async fn run_step(&self, step: &QueryStep) -> Result<Option<ShapedResult>> {
        match step.kind {
            StepKind::Effect => {
                self.engine.execute(&step.sql).await?;
                Ok(None)
            }
            StepKind::Produce => {
                let result = self.engine.query(&step.sql).await?;
                Ok(Some(shape(&result, &step.shape)?))
            }
        }
    }
}
