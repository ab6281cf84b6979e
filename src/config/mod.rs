//! # Configuration
//!
//! Run-level settings loaded from environment variables.

mod purge;

pub use purge::{ConfigError, PurgeConfig, RetryPolicy, TargetResource};
