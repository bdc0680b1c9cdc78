//! Bounded history sink with error accounting

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use super::entry::LogEntry;
use super::sink::{DiagnosticSink, SharedSink};

/// Keeps the last `capacity` entries as logfmt lines, counts warnings and
/// errors, and forwards every entry to a parent sink.
///
/// Context fields (for example `job=<name>`) are appended to entries on their
/// way to the parent only; the local history shows the entry as recorded.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use sqlpulse_common::{DiagnosticSink, LogEntry, NullSink, RotatingLog};
///
/// let log = RotatingLog::new(10, Arc::new(NullSink));
/// log.record(&LogEntry::warn("Failed to connect"));
/// assert_eq!(log.error_count(), 1);
/// assert!(log.last_is_error());
/// ```
pub struct RotatingLog {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
    errors: AtomicU64,
    last_error: AtomicBool,
    context: Vec<(String, String)>,
    next: RwLock<SharedSink>,
}

impl RotatingLog {
    /// Create a log keeping at most `capacity` lines. A capacity of zero keeps
    /// no history but still counts and forwards.
    pub fn new(capacity: usize, next: SharedSink) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            errors: AtomicU64::new(0),
            last_error: AtomicBool::new(false),
            context: Vec::new(),
            next: RwLock::new(next),
        }
    }

    /// Add a context field appended to every forwarded entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the parent sink. Entries already forwarded are not replayed.
    pub fn set_next(&self, next: SharedSink) {
        match self.next.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => {
                tracing::warn!("Rotating log parent lock poisoned, recovering");
                *poisoned.into_inner() = next;
            }
        }
    }

    fn lines(&self) -> MutexGuard<'_, VecDeque<String>> {
        match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Rotating log history lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn parent(&self) -> SharedSink {
        match self.next.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for RotatingLog {
    fn record(&self, entry: &LogEntry) {
        let is_error = entry.level.is_error();
        if is_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.last_error.store(is_error, Ordering::Relaxed);

        if self.capacity > 0 {
            let line = entry.to_logfmt();
            let mut lines = self.lines();
            while lines.len() >= self.capacity {
                lines.pop_front();
            }
            lines.push_back(line);
        }

        let parent = self.parent();
        if self.context.is_empty() {
            parent.record(entry);
        } else {
            parent.record(&entry.with_context(&self.context));
        }
    }

    fn history(&self) -> Vec<String> {
        self.lines().iter().cloned().collect()
    }

    fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn last_is_error(&self) -> bool {
        self.last_error.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RotatingLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingLog")
            .field("capacity", &self.capacity)
            .field("errors", &self.error_count())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
