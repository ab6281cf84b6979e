//! # Page Dispatcher
//!
//! Fans one page out to workers and joins them before the next page is
//! requested. At most one page is ever in flight, which is the only
//! backpressure between listing and deleting.

use super::{ItemOutcome, Purger};
use crate::store::Page;
use futures::{stream, StreamExt};
use tracing::debug;

impl Purger {
    /// Process every item of `page`, at most `concurrency` at a time.
    ///
    /// Returns once all workers finished, successful or not. Outcomes come
    /// back in completion order.
    pub async fn dispatch_page(&self, namespace: &str, page: Page) -> Vec<ItemOutcome> {
        let size = page.items.len();
        debug!(namespace, items = size, width = self.concurrency, "dispatching page");

        stream::iter(page.items)
            .map(|item| self.process_item(namespace, item))
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
    }
}
