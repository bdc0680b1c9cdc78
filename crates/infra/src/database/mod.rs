//! Database driver adapter
//!
//! Implements the core `Connector` port with sqlx's `Any` driver.

pub mod sqlx_connector;

pub use sqlx_connector::{SqlxConnector, SUPPORTED_DRIVERS};
