//! Logging setup built on `tracing-subscriber`
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the embedding process. [`init`] is a convenience for binaries and tests.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build a filter from `RUST_LOG`, falling back to `default_directive`
///
/// Returns `None` if neither parses.
pub fn env_filter(default_directive: &str) -> Option<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .ok()
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g.
/// `"cascade_engine=debug,info"`). Returns `false` if a global subscriber was
/// already installed or the filter is invalid; calling it twice is harmless.
pub fn init(default_directive: &str) -> bool {
    let Some(filter) = env_filter(default_directive) else {
        return false;
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init()
        .is_ok()
}
