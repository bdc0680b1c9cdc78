//! Terminal sink: hands entries to the `tracing` subscriber

use super::entry::{LogEntry, LogLevel};
use super::sink::DiagnosticSink;

/// Emits every entry as a `tracing` event.
///
/// Fields are attached as a single logfmt string so the subscriber's
/// formatter (JSON or text) decides the final layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, entry: &LogEntry) {
        let fields = entry.fields_logfmt();
        match entry.level {
            LogLevel::Debug => tracing::debug!(fields = %fields, "{}", entry.message),
            LogLevel::Info => tracing::info!(fields = %fields, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(fields = %fields, "{}", entry.message),
            LogLevel::Error => tracing::error!(fields = %fields, "{}", entry.message),
        }
    }
}
