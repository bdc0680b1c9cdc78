//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{connect_error, InfraError};
