//! # Observability
//!
//! Tracing subscriber setup for the purge binary.

use crate::config::PurgeConfig;
use crate::constants::DEFAULT_LOG_DIRECTIVE;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over the built-in `crd_purge=info`
/// directive. Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(config: &PurgeConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_enable_color)
        .with_target(false)
        .try_init()
    {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }
}
