//! Logging setup for waits and sweeps.
//!
//! Waiters log every refresh at `trace`, state transitions and completions at
//! `debug`, and sweeps log each matched resource at `info`. All output goes to
//! **stderr** because a provider's stdout carries the plugin handshake.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g. `info`,
//!   `hemmer_provider_convergence=debug`, `hemmer_provider_convergence::sweep=info`)
//!
//! ```bash
//! # Watch every refresh made by a slow cluster wait
//! RUST_LOG=hemmer_provider_convergence::waiter=trace ./my-provider
//!
//! # Preview what the test sweeper would delete
//! HEMMER_SWEEP_DRY_RUN=1 RUST_LOG=info cargo test -- --ignored sweep
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the default logging subscriber at `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging, using `default_level` when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Try to initialize logging, returning false if a subscriber already exists.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .is_ok()
}

/// Route logs through the test harness's captured output.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Defaults to `debug` so failing waits show their refresh history.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("debug"))
        .with(fmt::layer().with_test_writer().with_target(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("hemmer_provider_convergence=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_convergence::sweep=info").is_ok());
    }

    #[test]
    fn test_init_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
        assert!(!try_init_logging());
    }
}
