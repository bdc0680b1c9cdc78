//! Diagnostic sinks with bounded history
//!
//! Every job and every query owns a [`RotatingLog`]. A rotating log keeps the
//! last N formatted lines for the diagnostic pages, counts warning and error
//! entries, and forwards every entry to its parent sink. Parents are chained:
//!
//! ```text
//! query RotatingLog ──> job RotatingLog ──> root RotatingLog ──> LevelFilter ──> TracingSink
//!   (+ query=<name>)      (+ job=<name>)
//! ```
//!
//! so a query failure shows up in the query history, the job history and the
//! process-wide error count, and finally on the console.
//!
//! ## Design
//! - **One capability**: [`DiagnosticSink`] with `record`, `history`,
//!   `error_count` and `last_is_error`; variants compose by wrapping
//! - **VecDeque ring buffer** for O(1) eviction (not Vec with remove(0))
//! - **Poison-safe locking** with explicit match pattern (no .expect())
//! - **Infallible**: recording never returns an error to the caller

mod console;
mod entry;
mod rotating;
mod sink;

pub use console::TracingSink;
pub use entry::{LogEntry, LogLevel};
pub use rotating::RotatingLog;
pub use sink::{DiagnosticSink, LevelFilter, NullSink, SharedSink};
