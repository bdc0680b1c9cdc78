//! Resilience primitives
//!
//! Exponential backoff with jitter and an async retry loop bounded by a
//! total elapsed time. Time is read from the tokio clock so paused-time tests
//! drive the loop deterministically.

pub mod backoff;

pub use backoff::{retry, ExponentialBackoff, RetryError, RetryResult};
