//! Structured logging setup shared by the four service binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-driven filter (`RUST_LOG`, default `info`).
///
/// Safe to call more than once; later calls are no-ops so tests and embedded
/// uses do not panic on an already-installed subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_level(true));

    if subscriber.try_init().is_err() {
        tracing::debug!("global tracing subscriber already initialized");
    }
}
