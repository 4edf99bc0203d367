//! Diagnostic logging.
//!
//! The library logs through `tracing` macros only. The binary installs one
//! human-readable stderr layer here; stdout is reserved for reports.

use crate::config::DEFAULT_LOG_LEVEL;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Filter directive for the given CLI verbosity flags.
///
/// `-q` wins over `-v`; with neither, the configured level is used.
#[must_use]
pub fn verbosity_directive(verbose: bool, quiet: bool, configured: &str) -> String {
    if quiet {
        "error".to_string()
    } else if verbose {
        "debug".to_string()
    } else if configured.trim().is_empty() {
        DEFAULT_LOG_LEVEL.to_string()
    } else {
        configured.to_string()
    }
}

/// Build the stderr filter: `RUST_LOG` when set and valid, else `directive`,
/// else the default level.
#[must_use]
pub fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(directive: &str) {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(build_filter(directive));

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}
