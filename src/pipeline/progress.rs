//! Step-by-step progress reporting

use std::time::Duration;

use crate::diagnostics::DiagnosticsLog;

/// Progress of a run, emitted as it happens
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status(String),
    StepStarted {
        index: usize,
        total: usize,
        name: String,
    },
    StepFinished {
        index: usize,
        total: usize,
        name: String,
        rows: Option<usize>,
        elapsed: Duration,
    },
    StepFailed {
        index: usize,
        total: usize,
        name: String,
        message: String,
    },
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressEvent::Status(text) => write!(f, "{}", text),
            ProgressEvent::StepStarted { index, total, name } => {
                write!(f, "[{}/{}] Running {}...", index + 1, total, name)
            }
            ProgressEvent::StepFinished {
                index,
                total,
                name,
                rows,
                elapsed,
            } => match rows {
                Some(rows) => write!(
                    f,
                    "[{}/{}] {} done: {} rows in {} ms",
                    index + 1,
                    total,
                    name,
                    rows,
                    elapsed.as_millis()
                ),
                None => write!(
                    f,
                    "[{}/{}] {} done in {} ms",
                    index + 1,
                    total,
                    name,
                    elapsed.as_millis()
                ),
            },
            ProgressEvent::StepFailed {
                index,
                total,
                name,
                message,
            } => write!(f, "[{}/{}] {} failed: {}", index + 1, total, name, message),
        }
    }
}

/// Receives progress events
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn report(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

impl ProgressSink for tokio::sync::mpsc::UnboundedSender<ProgressEvent> {
    fn report(&mut self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(event);
    }
}

/// Status lines only; a failed step reaches the log as the run's error
impl ProgressSink for DiagnosticsLog {
    fn report(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::StepFailed { .. } => {}
            _ => self.info(event.to_string()),
        }
    }
}
