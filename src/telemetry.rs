//! Logging setup, called once at process startup.
//!
//! A single `init_tracing()` call: idempotent,
//! loud-but-not-fatal on a second call.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Install a `tracing` subscriber driven by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_tracing() {
    if INIT.set(()).is_err() {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
