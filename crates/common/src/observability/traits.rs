//! Tracing capability
//!
//! Components start spans through [`Tracer`] without depending on a concrete
//! tracing backend.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Creates trace spans.
pub trait Tracer: Send + Sync + Debug {
    /// Start a new trace span
    fn start_span(&self, operation: &str, metadata: HashMap<String, String>) -> TraceSpan;
}

/// Shared handle to a tracer.
pub type SharedTracer = Arc<dyn Tracer>;

/// Represents a trace span
#[derive(Debug, Clone)]
#[must_use = "trace spans should be finished to record timing data"]
pub struct TraceSpan {
    /// Span ID
    pub span_id: String,

    /// Trace ID
    pub trace_id: String,

    /// Operation name
    pub operation: String,

    /// Start timestamp
    pub start_time: SystemTime,

    /// Span tags
    pub metadata: HashMap<String, String>,
}

impl Default for TraceSpan {
    fn default() -> Self {
        Self {
            span_id: String::new(),
            trace_id: String::new(),
            operation: String::new(),
            start_time: UNIX_EPOCH,
            metadata: HashMap::new(),
        }
    }
}

impl TraceSpan {
    /// Returns the elapsed time between span start and now.
    pub fn elapsed(&self) -> Option<Duration> {
        SystemTime::now().duration_since(self.start_time).ok()
    }

    /// Attach or overwrite a tag.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Mark span as complete
    pub fn finish(self) {
        let elapsed_ms = self.elapsed().map(|elapsed| elapsed.as_millis());
        tracing::trace!(
            span_id = %self.span_id,
            trace_id = %self.trace_id,
            operation = %self.operation,
            elapsed_ms = ?elapsed_ms,
            "Trace span finished"
        );
    }
}

/// No-op tracer for testing or when tracing is disabled
#[derive(Debug, Clone, Default)]
pub struct NoOpTracer;

impl Tracer for NoOpTracer {
    fn start_span(&self, operation: &str, metadata: HashMap<String, String>) -> TraceSpan {
        TraceSpan {
            span_id: "noop".to_string(),
            trace_id: "noop".to_string(),
            operation: operation.to_string(),
            start_time: SystemTime::now(),
            metadata,
        }
    }
}

/// Tracer that assigns random identifiers and logs span starts at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn start_span(&self, operation: &str, metadata: HashMap<String, String>) -> TraceSpan {
        let mut rng = rand::thread_rng();
        let span = TraceSpan {
            span_id: format!("{:016x}", rng.gen::<u64>()),
            trace_id: format!("{:032x}", rng.gen::<u128>()),
            operation: operation.to_string(),
            start_time: SystemTime::now(),
            metadata,
        };
        tracing::debug!(
            span_id = %span.span_id,
            trace_id = %span.trace_id,
            operation = %span.operation,
            "Trace span started"
        );
        span
    }
}
