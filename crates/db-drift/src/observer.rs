//! Run observers.
//!
//! The comparator reports what it finds through a [`CompareObserver`] instead
//! of logging directly. [`TracingObserver`] maps events onto `tracing` levels;
//! the CLI adds a JSON progress writer on top of it.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::compare::TableOutcome;

/// How loudly an event should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Something the comparator wants reported.
#[derive(Debug, Clone, Copy)]
pub enum CompareEvent<'a> {
    /// A source schema was left out by the allow-list.
    SchemaSkipped { schema: &'a str, reason: &'a str },
    /// An outcome was recorded.
    Outcome(&'a TableOutcome),
}

impl CompareEvent<'_> {
    pub fn severity(&self) -> Severity {
        match self {
            CompareEvent::SchemaSkipped { .. } => Severity::Info,
            CompareEvent::Outcome(outcome) => outcome.severity(),
        }
    }

    /// The object the event is about, `schema` or `schema.table`.
    pub fn subject(&self) -> String {
        match self {
            CompareEvent::SchemaSkipped { schema, .. } => schema.to_string(),
            CompareEvent::Outcome(outcome) => outcome.subject(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            CompareEvent::SchemaSkipped { reason, .. } => reason.to_string(),
            CompareEvent::Outcome(outcome) => outcome.description(),
        }
    }
}

/// Per-table progress, reported before a table is checked.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub schema: String,
    pub table: String,
    /// 1-based position of the table within its schema.
    pub position: usize,
    /// Number of tables in the schema.
    pub total: usize,
}

impl Progress {
    pub fn label(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Receives events and progress from a comparison run.
pub trait CompareObserver: Send + Sync {
    fn on_event(&self, event: &CompareEvent<'_>);

    fn on_progress(&self, _progress: &Progress) {}
}

/// Logs events with `tracing`.
///
/// Info events are dropped unless `verbose` is set; warnings and errors are
/// always logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    verbose: bool,
}

impl TracingObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether an event of this severity would be logged.
    pub fn enabled(&self, severity: Severity) -> bool {
        self.verbose || severity > Severity::Info
    }
}

impl CompareObserver for TracingObserver {
    fn on_event(&self, event: &CompareEvent<'_>) {
        let severity = event.severity();
        if !self.enabled(severity) {
            return;
        }
        let subject = event.subject();
        let message = event.message();
        match severity {
            Severity::Info => info!("{} {}", subject, message),
            Severity::Warning => warn!("{} {}", subject, message),
            Severity::Error => error!("{} {}", subject, message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl CompareObserver for NullObserver {
    fn on_event(&self, _event: &CompareEvent<'_>) {}
}
