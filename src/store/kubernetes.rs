//! # Kubernetes Store
//!
//! [`ResourceStore`] backed by the Kubernetes API through `kube`'s dynamic
//! object API, so any custom resource can be purged without generated types.

use super::{Page, PageToken, ResourceItem, ResourceStore, StoreError};
use crate::config::TargetResource;
use crate::constants::{IN_CLUSTER_ENV, KUBECONFIG_ENV};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams},
    config::KubeConfigOptions,
    core::GroupVersionKind,
    Client, Config, ResourceExt,
};
use tracing::{debug, info};

/// Where cluster credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account token mounted into the pod
    InCluster,
    /// Kubeconfig resolved by kube's own loader: every file listed in
    /// `$KUBECONFIG` (merged in order) or `~/.kube/config`
    Kubeconfig,
}

impl CredentialSource {
    /// Inspect the process environment
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    /// In-cluster when the service host variable is set and non-empty,
    /// kubeconfig otherwise
    pub fn detect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(IN_CLUSTER_ENV).is_some_and(|v| !v.is_empty()) {
            Self::InCluster
        } else {
            Self::Kubeconfig
        }
    }

    /// Resolve into a client configuration
    ///
    /// # Errors
    ///
    /// Returns the underlying kube error when in-cluster credentials are
    /// missing or no kubeconfig can be read or parsed.
    pub async fn load(&self) -> Result<Config> {
        match self {
            Self::InCluster => Config::incluster().context("Failed to load in-cluster configuration"),
            Self::Kubeconfig => Config::from_kubeconfig(&KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig"),
        }
    }
}

/// Store talking to a live cluster
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve credentials from the environment and build a client
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the run: credentials could not be
    /// resolved or the client could not be constructed.
    pub async fn connect() -> Result<Self> {
        let source = CredentialSource::detect();
        match source {
            CredentialSource::InCluster => info!("Using in-cluster credentials"),
            CredentialSource::Kubeconfig => match std::env::var(KUBECONFIG_ENV) {
                Ok(paths) if !paths.is_empty() => info!("Using kubeconfig from {KUBECONFIG_ENV}={paths}"),
                _ => info!("Using default kubeconfig"),
            },
        }
        let config = source.load().await?;
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str, target: &TargetResource) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&target.group, &target.version, &target.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &target.resource);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

/// Classify a kube error by HTTP status
fn store_error(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(response) => match response.code {
            404 => StoreError::NotFound(response.message.clone()),
            409 => StoreError::Conflict(response.message.clone()),
            429 | 500..=599 => StoreError::Unavailable(response.message.clone()),
            _ => StoreError::Rejected(format!("{} ({})", response.message, response.code)),
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// A delete that finds nothing left to delete succeeded
fn delete_result<T>(result: Result<T, kube::Error>) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
        Err(e) => Err(store_error(e)),
    }
}

/// Merge patch replacing the finalizer list.
///
/// `resourceVersion` acts as a precondition: a stale version is answered
/// with 409 instead of being applied. An empty list is sent as `null`,
/// which removes the field.
fn finalizer_patch(item: &ResourceItem) -> serde_json::Value {
    let finalizers = if item.finalizers.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::json!(item.finalizers)
    };
    serde_json::json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": item.resource_version,
        }
    })
}

fn to_item(obj: &DynamicObject) -> ResourceItem {
    ResourceItem {
        name: obj.name_any(),
        finalizers: obj.finalizers().to_vec(),
        resource_version: obj.resource_version(),
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn list_namespaces(&self) -> Result<Vec<String>, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(store_error)?;
        Ok(list.items.iter().map(ResourceExt::name_any).collect())
    }

    async fn list_resources(
        &self,
        namespace: &str,
        target: &TargetResource,
        token: &PageToken,
        limit: u32,
    ) -> Result<Page, StoreError> {
        let mut params = ListParams::default().limit(limit);
        if let Some(token) = token.as_str() {
            params = params.continue_token(token);
        }
        let list = self
            .api(namespace, target)
            .list(&params)
            .await
            .map_err(store_error)?;
        debug!(
            namespace,
            items = list.items.len(),
            "listed {}",
            target.resource
        );
        Ok(Page {
            items: list.items.iter().map(to_item).collect(),
            next: PageToken::from_continue(list.metadata.continue_),
        })
    }

    async fn get_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        name: &str,
    ) -> Result<ResourceItem, StoreError> {
        let obj = self
            .api(namespace, target)
            .get(name)
            .await
            .map_err(store_error)?;
        Ok(to_item(&obj))
    }

    async fn update_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        item: &ResourceItem,
    ) -> Result<(), StoreError> {
        let patch = finalizer_patch(item);
        self.api(namespace, target)
            .patch(&item.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_resource(
        &self,
        namespace: &str,
        target: &TargetResource,
        name: &str,
    ) -> Result<(), StoreError> {
        let result = self
            .api(namespace, target)
            .delete(name, &DeleteParams::default())
            .await;
        if matches!(&result, Err(kube::Error::Api(response)) if response.code == 404) {
            debug!(namespace, name, "already deleted");
        }
        delete_result(result)
    }
}
