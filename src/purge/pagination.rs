//! # Page Walker
//!
//! Walks one namespace's listing to completion.
//!
//! A failed listing call does not abort the namespace: the cursor is reset
//! and the listing starts over from the first page after a backoff delay.
//! Items seen before the failure may be yielded again, which the worker
//! tolerates because update and delete are safe to repeat.

use super::backoff::FibonacciBackoff;
use super::{PurgeError, Purger};
use crate::config::{RetryPolicy, TargetResource};
use crate::store::{Page, PageToken, ResourceStore};
use tracing::{debug, warn};

/// Lazy sequence of pages for one namespace.
///
/// Not restartable: once exhausted, [`PageWalker::next_page`] keeps
/// returning `Ok(None)`. Start a fresh walker for a new pass.
pub struct PageWalker<'a> {
    store: &'a dyn ResourceStore,
    target: &'a TargetResource,
    namespace: &'a str,
    limit: u32,
    token: PageToken,
    retry: RetryPolicy,
    backoff: FibonacciBackoff,
    failures_since_progress: u32,
    pass_pages: usize,
    furthest: usize,
    pages: usize,
    finished: bool,
}

impl std::fmt::Debug for PageWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWalker")
            .field("namespace", &self.namespace)
            .field("token", &self.token)
            .field("pages", &self.pages)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<'a> PageWalker<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn ResourceStore,
        target: &'a TargetResource,
        namespace: &'a str,
        limit: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            target,
            namespace,
            limit,
            token: PageToken::start(),
            retry,
            backoff: FibonacciBackoff::new(retry.backoff_min, retry.backoff_max),
            failures_since_progress: 0,
            pass_pages: 0,
            furthest: 0,
            pages: 0,
            finished: false,
        }
    }

    /// Pages yielded so far, rescans included
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fetch the next non-empty page.
    ///
    /// Returns `Ok(None)` once a listing call comes back with no items or
    /// without a continue token (that last page is still yielded first).
    ///
    /// # Errors
    ///
    /// [`PurgeError::ListingAbandoned`] when the retry policy's limit of
    /// failed calls is reached without the walk getting any deeper into the
    /// listing than it already had. Re-reading pages after a rescan does not
    /// refill the budget; only a page past the furthest one reached does.
    /// The walker is finished afterwards.
    pub async fn next_page(&mut self) -> Result<Option<Page>, PurgeError> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let result = self
                .store
                .list_resources(self.namespace, self.target, &self.token, self.limit)
                .await;

            match result {
                Ok(page) => {
                    if page.items.is_empty() {
                        debug!(
                            namespace = self.namespace,
                            token = ?page.next.as_ref().and_then(PageToken::as_str),
                            "empty page, listing complete"
                        );
                        self.finished = true;
                        return Ok(None);
                    }

                    self.pass_pages += 1;
                    if self.pass_pages > self.furthest {
                        self.furthest = self.pass_pages;
                        self.failures_since_progress = 0;
                        self.backoff.reset();
                    }

                    match &page.next {
                        Some(next) => self.token = next.clone(),
                        None => self.finished = true,
                    }
                    self.pages += 1;
                    return Ok(Some(page));
                }
                Err(e) => {
                    self.failures_since_progress += 1;
                    if self.retry.is_exhausted(self.failures_since_progress) {
                        self.finished = true;
                        return Err(PurgeError::ListingAbandoned {
                            namespace: self.namespace.to_string(),
                            attempts: self.failures_since_progress,
                            last: e,
                        });
                    }

                    let delay = self.backoff.next_backoff();
                    warn!(
                        namespace = self.namespace,
                        attempt = self.failures_since_progress,
                        furthest_page = self.furthest,
                        error = %e,
                        "Listing failed, rescanning namespace from the first page in {}ms",
                        delay.as_millis()
                    );
                    self.token = PageToken::start();
                    self.pass_pages = 0;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl Purger {
    /// Start a fresh walk over `namespace`
    ///
    /// # Arguments
    ///
    /// * `namespace` - Namespace to list; the walk begins at its first page
    ///   with this purger's page size and listing retry policy
    #[must_use]
    pub fn walk<'a>(&'a self, namespace: &'a str) -> PageWalker<'a> {
        PageWalker::new(
            self.store.as_ref(),
            &self.target,
            namespace,
            self.page_size,
            self.list_retry,
        )
    }
}
