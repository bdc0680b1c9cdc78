//! # SQLPulse App
//!
//! Process layer - command line, HTTP routes and wiring.
//!
//! This crate contains:
//! - Command line flags
//! - Application context (dependency injection)
//! - HTTP handlers and the router
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the collector engine to the sqlx driver and the HTTP surface

pub mod cli;
pub mod commands;
pub mod context;
pub mod errors;
pub mod server;

// Re-export for convenience
pub use cli::Cli;
pub use context::AppContext;
pub use errors::ServerError;
pub use server::{bind_address, router, serve};
