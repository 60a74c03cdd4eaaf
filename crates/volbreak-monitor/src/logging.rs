//! Logging setup.

use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

/// Crates whose events follow the configured level; everything else logs
/// warnings only.
const WORKSPACE_TARGETS: &[&str] = &[
    "volbreak",
    "volbreak_core",
    "volbreak_signal",
    "volbreak_engine",
    "volbreak_broker",
    "volbreak_data",
    "volbreak_config",
    "volbreak_monitor",
];

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn setup_logging(level: &str, json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    }
}

fn default_directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(WORKSPACE_TARGETS.iter().map(|target| format!("{}={}", target, level)));
    directives.join(",")
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(default_directives(level)).unwrap_or_else(|_| EnvFilter::new("info"))
}
