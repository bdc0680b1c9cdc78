//! Modular common utilities shared across SQLPulse crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: shared dependencies (`thiserror`, `chrono`) without tracing
//!   or tokio
//! - `observability`: diagnostic sinks and the tracer capability (uses
//!   `tracing`)
//! - `runtime`: async infrastructure (backoff retry on the tokio clock)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Observability tier
// --------------------------------------------------------------
#[cfg(feature = "observability")]
pub mod diagnostics;
#[cfg(feature = "observability")]
pub mod observability;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "observability")]
pub use diagnostics::{
    DiagnosticSink, LevelFilter, LogEntry, LogLevel, NullSink, RotatingLog, SharedSink,
    TracingSink,
};
#[cfg(feature = "observability")]
pub use observability::{NoOpTracer, SharedTracer, TraceSpan, Tracer, TracingTracer};
#[cfg(feature = "runtime")]
pub use resilience::{retry, ExponentialBackoff, RetryError, RetryResult};
