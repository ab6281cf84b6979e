//! # Prelude
//!
//! Re-exports the types needed to wire up and run a purge.

pub use crate::config::{PurgeConfig, RetryPolicy, TargetResource};
pub use crate::purge::{
    ItemOutcome, Outcome, PageWalker, PurgeError, Purger, RecordingReporter, Reporter, RunOutcome,
    TracingReporter,
};
pub use crate::store::kubernetes::{CredentialSource, KubeStore};
pub use crate::store::{Page, PageToken, ResourceItem, ResourceStore, StoreError};
