//! Logging setup built on `tracing-subscriber`.
//!
//! Library code only emits `tracing` events; binaries, examples and tests call
//! [`init`] (or [`init_with_filter`]) once to see them.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,astrelis_msdf=debug";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Install a fmt subscriber with explicit filter directives, ignoring `RUST_LOG`.
pub fn init_with_filter(directives: &str) {
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    // A global subscriber may already be installed (tests, host application).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
