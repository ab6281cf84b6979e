//! In-memory resource store for pipeline tests.
//!
//! Behaves like the API server where it matters for the purge pipeline:
//! - listings are served from a snapshot taken when a walk starts, and the
//!   continue token points into that snapshot
//! - deleting an item that still has finalizers only marks it terminating
//! - updates are rejected with a conflict when the version token is stale
//! - deleting a missing item answers `NotFound`
//!
//! Every call is appended to a log so tests can assert on ordering.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use crd_purge::config::TargetResource;
use crd_purge::store::{Page, PageToken, ResourceItem, ResourceStore, StoreError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListNamespaces,
    List { namespace: String, token: Option<String> },
    Get { namespace: String, name: String },
    Update { namespace: String, name: String, finalizers: Vec<String> },
    DeleteStarted { namespace: String, name: String },
    DeleteFinished { namespace: String, name: String },
}

#[derive(Debug, Clone)]
struct Stored {
    item: ResourceItem,
    terminating: bool,
}

#[derive(Debug, Default)]
pub struct FakeStore {
    namespaces: Vec<String>,
    items: Mutex<HashMap<String, BTreeMap<String, Stored>>>,
    snapshots: Mutex<Vec<Vec<ResourceItem>>>,
    calls: Mutex<Vec<Call>>,
    list_calls: Mutex<HashMap<String, usize>>,
    /// (namespace, 1-based list call number) that fail
    failing_lists: Mutex<HashSet<(String, usize)>>,
    always_failing_lists: Mutex<HashSet<String>>,
    /// namespaces where every call carrying a continue token fails
    failing_continued_lists: Mutex<HashSet<String>>,
    fail_namespaces: Mutex<bool>,
    /// name -> remaining failures (usize::MAX = always)
    failing_deletes: Mutex<HashMap<String, usize>>,
    failing_gets: Mutex<HashMap<String, StoreError>>,
    failing_updates: Mutex<HashMap<String, StoreError>>,
    delete_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace holding `items`; each gets resource version "1"
    pub fn with_namespace(mut self, namespace: &str, items: Vec<ResourceItem>) -> Self {
        self.namespaces.push(namespace.to_string());
        let stored = items
            .into_iter()
            .map(|item| {
                let item = if item.resource_version.is_none() {
                    item.with_resource_version("1")
                } else {
                    item
                };
                (
                    item.name.clone(),
                    Stored {
                        item,
                        terminating: false,
                    },
                )
            })
            .collect();
        self.items
            .lock()
            .unwrap()
            .insert(namespace.to_string(), stored);
        self
    }

    pub fn fail_list_call(&self, namespace: &str, call_number: usize) {
        self.failing_lists
            .lock()
            .unwrap()
            .insert((namespace.to_string(), call_number));
    }

    pub fn fail_all_lists(&self, namespace: &str) {
        self.always_failing_lists
            .lock()
            .unwrap()
            .insert(namespace.to_string());
    }

    pub fn fail_continued_lists(&self, namespace: &str) {
        self.failing_continued_lists
            .lock()
            .unwrap()
            .insert(namespace.to_string());
    }

    pub fn fail_namespace_listing(&self) {
        *self.fail_namespaces.lock().unwrap() = true;
    }

    pub fn fail_delete(&self, name: &str, times: usize) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
    }

    pub fn fail_get(&self, name: &str, error: StoreError) {
        self.failing_gets
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn fail_update(&self, name: &str, error: StoreError) {
        self.failing_updates
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn set_delete_delay(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = delay;
    }

    /// Replace the stored copy of an item, bumping nothing
    pub fn put(&self, namespace: &str, item: ResourceItem) {
        self.items
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(
                item.name.clone(),
                Stored {
                    item,
                    terminating: false,
                },
            );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Names still present (terminating items included)
    pub fn remaining(&self, namespace: &str) -> Vec<String> {
        self.items
            .lock()
            .unwrap()
            .get(namespace)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<ResourceItem> {
        self.items
            .lock()
            .unwrap()
            .get(namespace)
            .and_then(|m| m.get(name))
            .map(|s| s.item.clone())
    }

    pub fn list_tokens(&self, namespace: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List { namespace: ns, token } if ns == namespace => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self, namespace: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteStarted { namespace: ns, name } if ns == namespace => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self, namespace: &str) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update {
                    namespace: ns,
                    name,
                    finalizers,
                } if ns == namespace => Some((name, finalizers)),
                _ => None,
            })
            .collect()
    }

    pub fn gets(&self, namespace: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Get { namespace: ns, name } if ns == namespace => Some(name),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_snapshot(&self, namespace: &str) -> usize {
        let items: Vec<ResourceItem> = self
            .items
            .lock()
            .unwrap()
            .get(namespace)
            .map(|m| m.values().map(|s| s.item.clone()).collect())
            .unwrap_or_default();
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.push(items);
        snapshots.len() - 1
    }
}

fn parse_token(token: &str) -> (usize, usize) {
    let (snapshot, offset) = token.split_once(':').expect("fake token");
    (snapshot.parse().unwrap(), offset.parse().unwrap())
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError> {
        self.record(Call::ListNamespaces);
        if *self.fail_namespaces.lock().unwrap() {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self.namespaces.clone())
    }

    async fn list_resources(
        &self,
        namespace: &str,
        _target: &TargetResource,
        token: &PageToken,
        limit: u32,
    ) -> Result<Page, StoreError> {
        self.record(Call::List {
            namespace: namespace.to_string(),
            token: token.as_str().map(str::to_string),
        });
        let call_number = {
            let mut counts = self.list_calls.lock().unwrap();
            let n = counts.entry(namespace.to_string()).or_default();
            *n += 1;
            *n
        };
        if self.always_failing_lists.lock().unwrap().contains(namespace)
            || self
                .failing_lists
                .lock()
                .unwrap()
                .contains(&(namespace.to_string(), call_number))
            || (token.as_str().is_some()
                && self.failing_continued_lists.lock().unwrap().contains(namespace))
        {
            return Err(StoreError::Unavailable("etcd leader changed".to_string()));
        }

        let (snapshot, offset) = match token.as_str() {
            Some(t) => parse_token(t),
            None => (self.take_snapshot(namespace), 0),
        };
        let snapshots = self.snapshots.lock().unwrap();
        let all = &snapshots[snapshot];
        let end = (offset + limit as usize).min(all.len());
        let items = all[offset..end].to_vec();
        let next = if end < all.len() {
            PageToken::from_continue(Some(format!("{snapshot}:{end}")))
        } else {
            None
        };
        Ok(Page { items, next })
    }

    async fn get_resource(
        &self,
        namespace: &str,
        _target: &TargetResource,
        name: &str,
    ) -> Result<ResourceItem, StoreError> {
        self.record(Call::Get {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if let Some(e) = self.failing_gets.lock().unwrap().get(name) {
            return Err(e.clone());
        }
        self.stored(namespace, name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn update_resource(
        &self,
        namespace: &str,
        _target: &TargetResource,
        item: &ResourceItem,
    ) -> Result<(), StoreError> {
        self.record(Call::Update {
            namespace: namespace.to_string(),
            name: item.name.clone(),
            finalizers: item.finalizers.clone(),
        });
        if let Some(e) = self.failing_updates.lock().unwrap().get(&item.name) {
            return Err(e.clone());
        }
        let mut items = self.items.lock().unwrap();
        let stored = items
            .get_mut(namespace)
            .and_then(|m| m.get_mut(&item.name))
            .ok_or_else(|| StoreError::NotFound(item.name.clone()))?;
        if stored.item.resource_version != item.resource_version {
            return Err(StoreError::Conflict(format!(
                "{} has version {:?}, update carried {:?}",
                item.name, stored.item.resource_version, item.resource_version
            )));
        }
        let next_version = stored
            .item
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        stored.item.finalizers = item.finalizers.clone();
        stored.item.resource_version = Some(next_version.to_string());
        // a terminating item is removed as soon as its last finalizer goes
        if stored.terminating && stored.item.finalizers.is_empty() {
            if let Some(m) = items.get_mut(namespace) {
                m.remove(&item.name);
            }
        }
        Ok(())
    }

    async fn delete_resource(
        &self,
        namespace: &str,
        _target: &TargetResource,
        name: &str,
    ) -> Result<(), StoreError> {
        self.record(Call::DeleteStarted {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delete_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut failing = self.failing_deletes.lock().unwrap();
            match failing.get_mut(name) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    Err(StoreError::Unavailable("apiserver timeout".to_string()))
                }
                _ => {
                    let mut items = self.items.lock().unwrap();
                    let bucket = items.entry(namespace.to_string()).or_default();
                    match bucket.get(name).map(|s| s.item.has_finalizers()) {
                        None => Err(StoreError::NotFound(name.to_string())),
                        Some(true) => {
                            if let Some(stored) = bucket.get_mut(name) {
                                stored.terminating = true;
                            }
                            Ok(())
                        }
                        Some(false) => {
                            bucket.remove(name);
                            Ok(())
                        }
                    }
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(Call::DeleteFinished {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        result
    }
}

/// Items named `{prefix}-000`, `{prefix}-001`, ... without finalizers
pub fn plain_items(prefix: &str, count: usize) -> Vec<ResourceItem> {
    (0..count)
        .map(|i| ResourceItem::new(format!("{prefix}-{i:03}")))
        .collect()
}

/// Config with immediate, unbounded listing retries
pub fn test_config(page_size: u32) -> crd_purge::config::PurgeConfig {
    crd_purge::config::PurgeConfig {
        page_size,
        concurrency: page_size as usize,
        list_retry: crd_purge::config::RetryPolicy::unbounded_immediate(),
        ..crd_purge::config::PurgeConfig::default()
    }
}

/// Purger over `store` reporting into a recorder
pub fn purger(
    store: &std::sync::Arc<FakeStore>,
    config: &crd_purge::config::PurgeConfig,
) -> (
    crd_purge::purge::Purger,
    std::sync::Arc<crd_purge::purge::RecordingReporter>,
) {
    let reporter = std::sync::Arc::new(crd_purge::purge::RecordingReporter::new());
    let purger = crd_purge::purge::Purger::new(
        std::sync::Arc::clone(store) as std::sync::Arc<dyn ResourceStore>,
        std::sync::Arc::clone(&reporter) as std::sync::Arc<dyn crd_purge::purge::Reporter>,
        config,
    );
    (purger, reporter)
}
