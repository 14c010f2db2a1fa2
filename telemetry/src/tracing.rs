//! Tracing initialization helpers.
//!
//! Provides a single place to configure the [`tracing_subscriber`] stack so that
//! binaries and tests emit logs with a consistent format. The filter is driven
//! by `RUST_LOG` and falls back to `info` when the variable is absent or
//! malformed.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TEST_TRACING: Once = Once::new();

/// Builds the environment filter used by all subscribers.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes tracing for a binary.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed, which indicates
/// the process called an init function twice.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .init();
}

/// Initializes tracing for tests.
///
/// Safe to call from every test: the subscriber is installed once per process
/// and subsequent calls are no-ops. Output is routed through the test writer
/// so it is captured per test by the harness.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .init();
    });
}
