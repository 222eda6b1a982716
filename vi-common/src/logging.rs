//! Tracing initialization shared by all VI binaries

use tracing_subscriber::EnvFilter;

/// Initialize a fmt subscriber.
///
/// Filter resolution: `VI_LOG`, then `RUST_LOG`, then `default_directive`
/// (usually the `[logging] level` from TOML).
pub fn init_tracing(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(true)
        .init();
}

pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env("VI_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}
