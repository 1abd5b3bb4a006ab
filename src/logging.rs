//! Initializes structured logging: a compact human-readable formatter gated
//! by `tracing_subscriber::EnvFilter`.

use tracing_subscriber::EnvFilter;

pub fn init(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
