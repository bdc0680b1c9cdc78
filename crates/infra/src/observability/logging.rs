//! JSON console logging
//!
//! ## Level selection
//! 1. `RUST_LOG`, when set, is used as a full `EnvFilter` directive
//! 2. Otherwise `LOGLEVEL` (`debug`, `info`, `warn`, `error`) sets the
//!    minimum level
//! 3. Otherwise everything is logged

use sqlpulse_domain::{Result, SqlPulseError};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the minimum log level.
pub const LOG_LEVEL_ENV: &str = "LOGLEVEL";

/// Filter directive for a `LOGLEVEL` value. Unknown or missing values allow
/// every level.
pub fn filter_directive(level: Option<&str>) -> &'static str {
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "trace",
    }
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(LOG_LEVEL_ENV).ok();
        EnvFilter::new(filter_directive(level.as_deref()))
    })
}

/// Install the global JSON subscriber on stdout.
///
/// # Errors
/// Returns `SqlPulseError::Internal` if a global subscriber is already set.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .map_err(|e| SqlPulseError::Internal(format!("failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loglevel_values() {
        assert_eq!(filter_directive(Some("debug")), "debug");
        assert_eq!(filter_directive(Some("INFO")), "info");
        assert_eq!(filter_directive(Some("Warn")), "warn");
        assert_eq!(filter_directive(Some("error")), "error");
    }

    #[test]
    fn test_loglevel_defaults_to_everything() {
        assert_eq!(filter_directive(None), "trace");
        assert_eq!(filter_directive(Some("")), "trace");
        assert_eq!(filter_directive(Some("verbose")), "trace");
    }
}
