//! Process-wide observability setup
//!
//! Diagnostic entries from jobs and queries end up as `tracing` events (see
//! `sqlpulse_common::TracingSink`); this module installs the subscriber that
//! writes them out.

pub mod logging;

pub use logging::{env_filter, filter_directive, init_logging, LOG_LEVEL_ENV};
