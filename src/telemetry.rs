//! Tracing setup for binaries and tests embedding the engine.
//!
//! The library itself only emits spans and events; hosts call [`init`] once at
//! startup to install a subscriber. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber with the given default level
/// (e.g. `"info"`). Env filter syntax from `RUST_LOG` takes precedence.
///
/// Calling this twice panics, as the global default can only be set once;
/// use [`try_init`] when that is not acceptable.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Like [`init`] but ignores an already-installed subscriber. Used by tests
/// that want log output without coordinating a single init point.
pub fn try_init(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
