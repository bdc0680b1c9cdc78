//! Observability primitives
//!
//! Holds the tracer capability jobs use to wrap each per-connection run in a
//! span. The default tracer does nothing; [`TracingTracer`] reports spans
//! through the `tracing` subscriber.

pub mod traits;

pub use traits::{NoOpTracer, SharedTracer, TraceSpan, Tracer, TracingTracer};
