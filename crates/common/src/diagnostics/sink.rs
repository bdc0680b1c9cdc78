//! The diagnostic sink capability and its simplest implementations

use std::sync::Arc;

use super::entry::{LogEntry, LogLevel};

/// Destination for structured diagnostic entries.
///
/// Implementations must be cheap to call from many tasks at once. History and
/// counters are optional: sinks that do not keep them return the defaults.
pub trait DiagnosticSink: Send + Sync {
    /// Record one entry. Never fails.
    fn record(&self, entry: &LogEntry);

    /// Formatted history lines, oldest first.
    fn history(&self) -> Vec<String> {
        Vec::new()
    }

    /// Number of warning or error entries seen so far.
    fn error_count(&self) -> u64 {
        0
    }

    /// Whether the most recent entry was a warning or an error.
    fn last_is_error(&self) -> bool {
        false
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _entry: &LogEntry) {}
}

/// Forwards only entries at or above a minimum level.
pub struct LevelFilter {
    min: LogLevel,
    next: SharedSink,
}

impl LevelFilter {
    pub fn new(min: LogLevel, next: SharedSink) -> Self {
        Self { min, next }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min
    }
}

impl DiagnosticSink for LevelFilter {
    fn record(&self, entry: &LogEntry) {
        if entry.level >= self.min {
            self.next.record(entry);
        }
    }
}

impl std::fmt::Debug for LevelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelFilter").field("min", &self.min).finish_non_exhaustive()
    }
}
