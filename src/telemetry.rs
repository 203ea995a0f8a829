//! Tracing subscriber setup for binaries and examples.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Error installing the global subscriber.
#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// Install a fmt subscriber honoring `RUST_LOG`, defaulting to
/// `textweave=info`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn try_init() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("textweave=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| TelemetryError(err.to_string()))
}

/// Like [`try_init`], but ignores an already-installed subscriber.
pub fn init() {
    let _ = try_init();
}
