//! Logging infrastructure for IMC preprocessing.
//!
//! This module provides:
//! - A per-run logger with file + callback dual output
//! - Tail buffer of external tool output for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use imc_core::logging::{RunLogger, LogConfig};
//!
//! let logger = RunLogger::new("imc_run", ".logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Convert");
//! logger.info("slide_01.txt");
//! logger.success("Convert completed");
//! ```

mod run_logger;
mod types;

pub use run_logger::{timestamped_run_name, RunLogger};
pub use types::{LogCallback, LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.filter_directive()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
