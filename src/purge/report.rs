//! # Reporting
//!
//! Per-item outcomes leave the pipeline through a [`Reporter`] instead of
//! being printed directly, so the console format can change without
//! touching the pipeline and tests can assert on what was reported.

use crate::store::StoreError;
use std::sync::Mutex;
use tracing::{error, info};

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Finalizers were removed ahead of deletion
    FinalizersCleared,
    /// Re-fetch or update failed; deletion is still attempted
    FinalizerClearFailed,
    Deleted,
    DeleteFailed,
    /// Dry run: the item would have been processed
    Skipped,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::FinalizersCleared => "finalizers-cleared",
            Outcome::FinalizerClearFailed => "finalizer-clear-failed",
            Outcome::Deleted => "deleted",
            Outcome::DeleteFailed => "delete-failed",
            Outcome::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::FinalizerClearFailed | Outcome::DeleteFailed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for progress and per-item outcomes.
///
/// Called concurrently from every worker of a page.
pub trait Reporter: Send + Sync {
    /// A namespace is about to be walked
    fn namespace_entered(&self, namespace: &str);

    /// `cause` is set for failures
    fn report(&self, namespace: &str, name: &str, outcome: Outcome, cause: Option<&StoreError>);
}

/// Writes human-readable progress lines through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn namespace_entered(&self, namespace: &str) {
        info!(namespace, "Purging resources in namespace {}", namespace);
    }

    fn report(&self, namespace: &str, name: &str, outcome: Outcome, cause: Option<&StoreError>) {
        match (outcome, cause) {
            (Outcome::FinalizersCleared, _) => info!(namespace, name, "Removed finalizers from {}", name),
            (Outcome::Deleted, _) => info!(namespace, name, "Deleted {}", name),
            (Outcome::Skipped, _) => info!(namespace, name, "Dry run: would delete {}", name),
            (Outcome::FinalizerClearFailed, Some(e)) => {
                error!(namespace, name, error = %e, "Failed to remove finalizers from {}: {}", name, e);
            }
            (Outcome::DeleteFailed, Some(e)) => {
                error!(namespace, name, error = %e, "Failed to delete {}: {}", name, e);
            }
            (outcome, None) => error!(namespace, name, "{} {}", outcome, name),
        }
    }
}

/// One recorded report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub namespace: String,
    pub name: String,
    pub outcome: Outcome,
    pub cause: Option<StoreError>,
}

/// Keeps every report in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    namespaces: Mutex<Vec<String>>,
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces entered so far
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Reports for one outcome, optionally limited to a namespace
    #[must_use]
    pub fn with_outcome(&self, outcome: Outcome, namespace: Option<&str>) -> Vec<Report> {
        self.reports()
            .into_iter()
            .filter(|r| r.outcome == outcome)
            .filter(|r| namespace.map_or(true, |ns| r.namespace == ns))
            .collect()
    }

    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.with_outcome(outcome, None).len()
    }
}

impl Reporter for RecordingReporter {
    fn namespace_entered(&self, namespace: &str) {
        if let Ok(mut namespaces) = self.namespaces.lock() {
            namespaces.push(namespace.to_string());
        }
    }

    fn report(&self, namespace: &str, name: &str, outcome: Outcome, cause: Option<&StoreError>) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(Report {
                namespace: namespace.to_string(),
                name: name.to_string(),
                outcome,
                cause: cause.cloned(),
            });
        }
    }
}
