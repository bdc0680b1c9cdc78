//! # SQLPulse Domain
//!
//! Configuration and error types shared by every SQLPulse crate.
//!
//! This crate contains:
//! - The exporter configuration document (jobs, queries, named queries)
//! - The domain error taxonomy and Result alias
//! - Domain constants (default listen address, history limit, label names)
//!
//! ## Architecture
//! - No dependencies on other SQLPulse crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
