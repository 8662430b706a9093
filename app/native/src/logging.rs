//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The `RUST_LOG` environment variable takes precedence; otherwise
/// `default_filter` applies. Repeated calls are ignored, so tests and
/// library embedders can call this freely.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
