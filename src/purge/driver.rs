//! # Namespace Driver
//!
//! Top of the pipeline: one namespace at a time, one page at a time.

use super::{PurgeError, Purger};
use tracing::{error, info, info_span, Instrument};

/// What the driver could not get through
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Namespaces enumerated at the start of the run
    pub namespaces: usize,
    /// Namespaces whose listing was given up, with the reason
    pub abandoned: Vec<PurgeError>,
}

impl RunOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }
}

impl Purger {
    /// Purge every namespace present at the start of the run.
    ///
    /// Namespaces created after enumeration are not visited. A namespace
    /// whose listing is abandoned is recorded and the run moves on.
    ///
    /// # Errors
    ///
    /// [`PurgeError::NamespaceEnumeration`] if the namespace list cannot be
    /// fetched. Nothing has been touched at that point.
    pub async fn run(&self) -> Result<RunOutcome, PurgeError> {
        let namespaces = self
            .store
            .list_namespaces()
            .await
            .map_err(PurgeError::NamespaceEnumeration)?;

        info!(
            "Purging {} from {} namespaces",
            self.target,
            namespaces.len()
        );

        let mut outcome = RunOutcome {
            namespaces: namespaces.len(),
            abandoned: Vec::new(),
        };

        for namespace in &namespaces {
            if let Err(e) = self.purge_namespace(namespace).await {
                error!(namespace = %namespace, error = %e, "Giving up on namespace {}", namespace);
                outcome.abandoned.push(e);
            }
        }

        Ok(outcome)
    }

    /// Walk one namespace to the end, dispatching each page as it arrives.
    ///
    /// Returns the number of pages processed.
    ///
    /// # Errors
    ///
    /// [`PurgeError::ListingAbandoned`] when the listing retry budget runs
    /// out. Pages processed before that are not rolled back.
    pub async fn purge_namespace(&self, namespace: &str) -> Result<usize, PurgeError> {
        let span = info_span!("purge.namespace", namespace);
        async move {
            self.reporter.namespace_entered(namespace);

            let mut walker = self.walk(namespace);
            while let Some(page) = walker.next_page().await? {
                self.dispatch_page(namespace, page).await;
            }

            info!(pages = walker.pages(), "Finished namespace {}", namespace);
            Ok(walker.pages())
        }
        .instrument(span)
        .await
    }
}
