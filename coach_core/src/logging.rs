//! Tracing setup for the `coach` binary.
//!
//! Diagnostics always go to stderr: stdout belongs to the player display
//! (step lines, cues, the live countdown), so a `RUST_LOG=debug` run can be
//! redirected without garbling the workout.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber at INFO: session lifecycle, store loads and saves,
/// catch-up after suspension
pub fn init() {
    init_with_level("info")
}

/// Install the subscriber with `default_level` unless `RUST_LOG` is set
///
/// The CLI passes `warn` so only recovered corruption (unreadable program
/// file, skipped history lines) interrupts a workout.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Route debug output (per-transition and catch-up events) into the test harness
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
