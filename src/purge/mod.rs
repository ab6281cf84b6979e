//! # Purge Pipeline
//!
//! Namespace driver → page walker → page dispatcher → item workers.
//!
//! - `driver`: enumerates namespaces and walks them one at a time
//! - `pagination`: follows continue tokens, rescanning from the start on failure
//! - `dispatch`: runs one page of workers and waits for all of them
//! - `worker`: clears finalizers from a fresh copy, then deletes
//! - `report`: outcome sink
//! - `backoff`: delay between rescans

pub mod backoff;
mod dispatch;
mod driver;
pub mod pagination;
pub mod report;
mod worker;

pub use driver::RunOutcome;
pub use pagination::PageWalker;
pub use report::{Outcome, RecordingReporter, Reporter, TracingReporter};
pub use worker::ItemOutcome;

use crate::config::{PurgeConfig, RetryPolicy, TargetResource};
use crate::store::{ResourceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PurgeError {
    /// Fatal: nothing can be purged without the namespace list
    #[error("failed to enumerate namespaces: {0}")]
    NamespaceEnumeration(#[source] StoreError),
    /// Namespace-level: the listing kept failing and the retry budget ran out
    #[error("listing in namespace {namespace} abandoned after {attempts} failures without progress: {last}")]
    ListingAbandoned {
        namespace: String,
        attempts: u32,
        #[source]
        last: StoreError,
    },
}

/// Shared, read-only context for one run.
///
/// Workers of a page borrow it concurrently; nothing in here is mutated
/// once the run starts.
pub struct Purger {
    store: Arc<dyn ResourceStore>,
    reporter: Arc<dyn Reporter>,
    target: TargetResource,
    page_size: u32,
    concurrency: usize,
    list_retry: RetryPolicy,
    dry_run: bool,
}

impl std::fmt::Debug for Purger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Purger")
            .field("target", &self.target)
            .field("page_size", &self.page_size)
            .field("concurrency", &self.concurrency)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Purger {
    /// Build a purger for one run
    ///
    /// # Arguments
    ///
    /// * `store` - Backend every listing, read, update and delete goes through
    /// * `reporter` - Receives one outcome per finalizer clear and per delete
    /// * `config` - Target resource, page size, concurrency, retry policy and
    ///   dry-run flag; a concurrency of zero is treated as one
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        reporter: Arc<dyn Reporter>,
        config: &PurgeConfig,
    ) -> Self {
        Self {
            store,
            reporter,
            target: config.target.clone(),
            page_size: config.page_size,
            concurrency: config.concurrency.max(1),
            list_retry: config.list_retry,
            dry_run: config.dry_run,
        }
    }
}
