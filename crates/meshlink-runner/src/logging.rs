//! Tracing subscriber setup.
//!
//! Levels:
//! - ERROR: the gateway cannot continue (mesh session lost at startup)
//! - WARN: failed commands, transport faults, timeouts
//! - INFO: session established, commands acknowledged
//! - DEBUG: discarded frames, ignored packets
//! - TRACE: per-poll and wire-level detail

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Calling this twice is a
/// no-op.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Install a subscriber that writes through the test harness.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
