//! Diagnostic tracing for skip decisions.
//!
//! stdout is reserved for the JSON decision that CI scripts parse, so every
//! diagnostic goes to stderr. Fetch failures, dropped runs and backtracking
//! limit hits are logged at `warn` and stay visible under the default filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Initialize the tracing subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=skipcheck=debug skipcheck decide --runs runs.json
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
