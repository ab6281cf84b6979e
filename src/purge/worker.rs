//! # Item Worker
//!
//! Clears blocking finalizers and deletes a single item.

use super::{Outcome, Purger};
use crate::store::{ResourceItem, StoreError};
use tracing::{debug, info_span, Instrument};

/// Result of processing one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemOutcome {
    /// `None` when the listed item carried no finalizers
    pub finalizers: Option<Outcome>,
    pub delete: Outcome,
}

impl Purger {
    /// Clear finalizers (when the listing showed any) and delete the item.
    ///
    /// Clearing is best-effort: a failed clear is reported and the delete is
    /// attempted anyway. Errors never leave this function; they are reported
    /// and folded into the returned [`ItemOutcome`].
    pub async fn process_item(&self, namespace: &str, item: ResourceItem) -> ItemOutcome {
        let span = info_span!("purge.item", namespace, name = %item.name);
        async move {
            if self.dry_run {
                self.reporter.report(namespace, &item.name, Outcome::Skipped, None);
                return ItemOutcome {
                    finalizers: None,
                    delete: Outcome::Skipped,
                };
            }

            let finalizers = if item.has_finalizers() {
                Some(match self.clear_finalizers(namespace, &item.name).await {
                    Ok(true) => {
                        self.reporter
                            .report(namespace, &item.name, Outcome::FinalizersCleared, None);
                        Outcome::FinalizersCleared
                    }
                    Ok(false) => {
                        debug!("finalizers already removed by someone else");
                        Outcome::FinalizersCleared
                    }
                    Err(e) => {
                        self.reporter.report(
                            namespace,
                            &item.name,
                            Outcome::FinalizerClearFailed,
                            Some(&e),
                        );
                        Outcome::FinalizerClearFailed
                    }
                })
            } else {
                None
            };

            let delete = match self
                .store
                .delete_resource(namespace, &self.target, &item.name)
                .await
            {
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    self.reporter.report(namespace, &item.name, Outcome::Deleted, None);
                    Outcome::Deleted
                }
                Err(e) => {
                    self.reporter
                        .report(namespace, &item.name, Outcome::DeleteFailed, Some(&e));
                    Outcome::DeleteFailed
                }
            };

            ItemOutcome { finalizers, delete }
        }
        .instrument(span)
        .await
    }

    /// Re-read the item and write it back without finalizers.
    ///
    /// Never works from the listed copy: the update carries the version token
    /// of the fresh read, so concurrent changes to other fields are not
    /// overwritten. Returns `false` if the fresh copy had no finalizers left.
    async fn clear_finalizers(&self, namespace: &str, name: &str) -> Result<bool, StoreError> {
        let mut fresh = self.store.get_resource(namespace, &self.target, name).await?;
        if !fresh.has_finalizers() {
            return Ok(false);
        }
        fresh.finalizers.clear();
        self.store
            .update_resource(namespace, &self.target, &fresh)
            .await?;
        Ok(true)
    }
}
