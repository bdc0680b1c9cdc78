//! # SQLPulse Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The sqlx-backed database connector (PostgreSQL, MySQL, SQLite)
//! - Configuration file loading
//! - Process-wide logging setup
//! - Conversions from driver errors into domain errors
//!
//! ## Architecture
//! - Implements traits defined in `sqlpulse-core`
//! - Contains all "impure" code (network, files, process-wide state)

pub mod config;
pub mod database;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use database::SqlxConnector;
pub use errors::InfraError;
