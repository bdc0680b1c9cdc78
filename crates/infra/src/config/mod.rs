//! Configuration loading
//!
//! This module loads the exporter configuration document from a file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load_from_file, parse_config};
