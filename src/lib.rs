//! Bulk deletion of one custom resource type across every namespace.
//!
//! Each namespace is listed page by page; every item on a page is handled by
//! its own worker, which strips blocking finalizers from a freshly read copy
//! and then deletes the item. The next page is only requested once the
//! current one is fully processed.
//!
//! ## Quick Start
//!
//! Read settings from the environment, connect with whatever credentials
//! are available, and purge:
//!
//! ```rust,no_run
//! use crd_purge::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn purge() -> anyhow::Result<()> {
//! let config = PurgeConfig::from_env();
//! config.validate()?;
//!
//! let store = KubeStore::connect().await?;
//! let purger = Purger::new(Arc::new(store), Arc::new(TracingReporter), &config);
//!
//! let outcome = purger.run().await?;
//! if !outcome.is_complete() {
//!     for err in &outcome.abandoned {
//!         eprintln!("{err}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Tests swap [`store::kubernetes::KubeStore`] for any other [`store::ResourceStore`] and
//! [`purge::TracingReporter`] for [`purge::RecordingReporter`].

pub mod config;
pub mod constants;
pub mod observability;
pub mod prelude;
pub mod purge;
pub mod store;
