//! # Constants
//!
//! Defaults for the purge run.
//!
//! Every value here can be overridden through the environment, see
//! [`crate::config::PurgeConfig::from_env`].

/// API group of the custom resource being purged
pub const DEFAULT_TARGET_GROUP: &str = "spaas.smartnews.com";

/// API version of the custom resource being purged
pub const DEFAULT_TARGET_VERSION: &str = "v1alpha1";

/// Plural (lowercase) resource name used in API paths
pub const DEFAULT_TARGET_RESOURCE: &str = "terraformplans";

/// Kind of the custom resource being purged
pub const DEFAULT_TARGET_KIND: &str = "TerraformPlan";

/// Number of items requested per listing call
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Failed listing calls tolerated for one namespace, without the walk getting any deeper, before it is abandoned
/// Zero disables the limit
pub const DEFAULT_LIST_RETRY_LIMIT: u32 = 10;

/// First delay before rescanning a namespace after a failed listing call (milliseconds)
pub const DEFAULT_LIST_BACKOFF_MIN_MS: u64 = 500;

/// Upper bound for the rescan delay (milliseconds)
pub const DEFAULT_LIST_BACKOFF_MAX_MS: u64 = 30_000;

/// Environment variable that marks an in-cluster run
pub const IN_CLUSTER_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Environment variable listing kubeconfig files
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Default tracing directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "crd_purge=info";
