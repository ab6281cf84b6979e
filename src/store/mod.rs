//! # Resource Store
//!
//! The seam between the purge pipeline and the cluster API.
//!
//! The pipeline only ever talks to a [`ResourceStore`]. The production
//! implementation is [`kubernetes::KubeStore`]; tests drive the pipeline with an
//! in-memory store.

use crate::config::TargetResource;
use async_trait::async_trait;
use thiserror::Error;

pub mod kubernetes;

/// Failure of a single store call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure or server-side error; the call may succeed if repeated
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the request (bad continue token, forbidden, invalid)
    #[error("store rejected request: {0}")]
    Rejected(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Optimistic concurrency check failed, the version token was stale
    #[error("conflict: {0}")]
    Conflict(String),
}

/// One instance of the target resource as seen by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Unique within namespace and kind
    pub name: String,
    pub finalizers: Vec<String>,
    /// Opaque version token used to guard updates
    pub resource_version: Option<String>,
}

impl ResourceItem {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            finalizers: Vec::new(),
            resource_version: None,
        }
    }

    #[must_use]
    pub fn with_finalizers<I, S>(mut self, finalizers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.finalizers = finalizers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }

    /// True when the store would hold deletion until finalizers are removed
    #[must_use]
    pub fn has_finalizers(&self) -> bool {
        !self.finalizers.is_empty()
    }
}

/// Continuation cursor for a paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PageToken(Option<String>);

impl PageToken {
    /// The cursor that starts a listing from the beginning
    #[must_use]
    pub fn start() -> Self {
        Self(None)
    }

    /// Normalise a continue token returned by the store.
    ///
    /// `None` and the empty string both mean the listing is complete.
    #[must_use]
    pub fn from_continue(token: Option<String>) -> Option<Self> {
        token.filter(|t| !t.is_empty()).map(|t| Self(Some(t)))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Result of one listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<ResourceItem>,
    /// Cursor for the following page, `None` at the end of the listing
    pub next: Option<PageToken>,
}

/// Remote list/get/update/delete primitives the pipeline needs.
///
/// Implementations must be safe to share between concurrently running
/// workers without client-side locking.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Every namespace in the cluster, in store order
    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError>;

    /// One page of target resources in `namespace`
    async fn list_resources(
        &self,
        namespace: &str,
        target: &TargetResource,
        token: &PageToken,
        limit: u32,
    ) -> Result<Page, StoreError>;

    /// Current state of a single resource
    async fn get_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        name: &str,
    ) -> Result<ResourceItem, StoreError>;

    /// Write `item.finalizers` back, guarded by `item.resource_version`
    async fn update_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        item: &ResourceItem,
    ) -> Result<(), StoreError>;

    /// Delete a resource; deleting an absent resource succeeds
    async fn delete_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        name: &str,
    ) -> Result<(), StoreError>;
}
