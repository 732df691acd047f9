//! Tracing setup for the fleet store and the `fleetk` binary.
//!
//! Log lines go to stderr. Stdout is reserved for tables and `--json`
//! documents.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets that follow the command line verbosity.
const FLEET_TARGETS: &[&str] = &["fleetkeeper", "fleetk"];

/// How much the fleet code logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Saves, services and seeding.
    #[default]
    Normal,
    /// Adds pool and query details (`-v`).
    Verbose,
    /// Everything (`-vv`).
    Trace,
}

impl Verbosity {
    /// Level applied to the fleet targets.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    ///
    /// Dependencies stay at `warn` so pool checkouts do not drown out fleet
    /// events.
    #[must_use]
    pub fn default_directive(&self) -> String {
        let level = self.to_level_filter();
        let targets: Vec<String> = FLEET_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        format!("warn,{}", targets.join(","))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the verbosity-derived filter when set. Calling this
/// again after a subscriber is installed does nothing.
///
/// ```no_run
/// use fleetkeeper::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init();
}

/// Route warnings from the code under test through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
