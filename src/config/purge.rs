//! # Purge Configuration
//!
//! Settings for a single purge run. All settings have defaults from
//! [`crate::constants`] and can be overridden via environment variables.

use std::time::Duration;
use thiserror::Error;

/// Invalid configuration detected before any namespace is touched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("target resource {field} must not be empty")]
    EmptyTarget { field: &'static str },
    #[error("list backoff minimum ({min_ms}ms) exceeds maximum ({max_ms}ms)")]
    BackoffRange { min_ms: u64, max_ms: u64 },
}

/// The (group, version, resource) triple being purged, plus its kind.
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResource {
    pub group: String,
    pub version: String,
    /// Plural lowercase name as it appears in API paths
    pub resource: String,
    pub kind: String,
}

impl TargetResource {
    #[must_use]
    pub fn new(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
        }
    }

    /// `group/version`, or just `version` for the core group
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for TargetResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}/{}", self.resource, self.group, self.version)
    }
}

/// How a namespace listing is retried after a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed listing calls tolerated since the walk last got deeper into the
    /// listing than before; zero means retry forever
    pub max_failures_without_progress: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    /// Retry immediately, never give up
    #[must_use]
    pub fn unbounded_immediate() -> Self {
        Self {
            max_failures_without_progress: 0,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_failures_without_progress != 0 && failures >= self.max_failures_without_progress
    }
}

/// Settings for one purge run
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Custom resource type being deleted
    pub target: TargetResource,
    /// `limit` passed to every listing call
    pub page_size: u32,
    /// Maximum workers in flight for one page
    /// Defaults to the page size so a whole page runs at once
    pub concurrency: usize,
    /// Listing retry behaviour
    pub list_retry: RetryPolicy,
    /// Walk and report without issuing any mutation
    pub dry_run: bool,
    /// Enable ANSI colour in log output
    pub log_enable_color: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            target: TargetResource::new(
                DEFAULT_TARGET_GROUP,
                DEFAULT_TARGET_VERSION,
                DEFAULT_TARGET_RESOURCE,
                DEFAULT_TARGET_KIND,
            ),
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_PAGE_SIZE as usize,
            list_retry: RetryPolicy {
                max_failures_without_progress: DEFAULT_LIST_RETRY_LIMIT,
                backoff_min: Duration::from_millis(DEFAULT_LIST_BACKOFF_MIN_MS),
                backoff_max: Duration::from_millis(DEFAULT_LIST_BACKOFF_MAX_MS),
            },
            dry_run: false,
            log_enable_color: false,
        }
    }
}

impl PurgeConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset or unparsable values fall back to their defaults; call
    /// [`PurgeConfig::validate`] before use.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value for a variable name, `None` when unset
    ///
    /// # Example
    ///
    /// ```rust
    /// use crd_purge::config::PurgeConfig;
    ///
    /// let config = PurgeConfig::from_lookup(|key| match key {
    ///     "PURGE_PAGE_SIZE" => Some("25".to_string()),
    ///     "PURGE_DRY_RUN" => Some("true".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.page_size, 25);
    /// assert!(config.dry_run);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        let page_size = parse_or(&lookup, "PURGE_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        Self {
            target: TargetResource {
                group: str_or(&lookup, "PURGE_GROUP", DEFAULT_TARGET_GROUP),
                version: str_or(&lookup, "PURGE_VERSION", DEFAULT_TARGET_VERSION),
                resource: str_or(&lookup, "PURGE_RESOURCE", DEFAULT_TARGET_RESOURCE),
                kind: str_or(&lookup, "PURGE_KIND", DEFAULT_TARGET_KIND),
            },
            page_size,
            concurrency: parse_or(&lookup, "PURGE_CONCURRENCY", page_size as usize).max(1),
            list_retry: RetryPolicy {
                max_failures_without_progress: parse_or(
                    &lookup,
                    "PURGE_LIST_RETRY_LIMIT",
                    DEFAULT_LIST_RETRY_LIMIT,
                ),
                backoff_min: Duration::from_millis(parse_or(
                    &lookup,
                    "PURGE_LIST_BACKOFF_MIN_MS",
                    DEFAULT_LIST_BACKOFF_MIN_MS,
                )),
                backoff_max: Duration::from_millis(parse_or(
                    &lookup,
                    "PURGE_LIST_BACKOFF_MAX_MS",
                    DEFAULT_LIST_BACKOFF_MAX_MS,
                )),
            },
            dry_run: bool_or(&lookup, "PURGE_DRY_RUN", false),
            log_enable_color: bool_or(&lookup, "LOG_ENABLE_COLOR", false),
        }
    }

    /// Reject settings the pipeline cannot run with
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero page size, an empty target field,
    /// or an inverted backoff range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        for (field, value) in [
            ("version", &self.target.version),
            ("resource", &self.target.resource),
            ("kind", &self.target.kind),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyTarget { field });
            }
        }
        if self.list_retry.backoff_min > self.list_retry.backoff_max {
            return Err(ConfigError::BackoffRange {
                min_ms: duration_ms(self.list_retry.backoff_min),
                max_ms: duration_ms(self.list_retry.backoff_max),
            });
        }
        Ok(())
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Read a value and parse it, or return default value
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a value as boolean or return default
fn bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Read a value as string or return default
fn str_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}
