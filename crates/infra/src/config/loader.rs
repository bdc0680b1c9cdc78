//! Configuration loader
//!
//! Reads the exporter configuration document from a file and validates it.
//!
//! ## Formats
//! The format is chosen by file extension:
//! - `.yml` / `.yaml` (default when the extension is missing)
//! - `.json`
//! - `.toml`

use std::path::Path;

use sqlpulse_domain::{ExporterConfig, Result, SqlPulseError};

/// Load and validate configuration from a file
///
/// # Errors
/// Returns `SqlPulseError::Config` if:
/// - The file does not exist or cannot be read
/// - The format is unsupported or the content is invalid
/// - Validation fails (see [`ExporterConfig::validate`])
pub fn load_from_file(path: &Path) -> Result<ExporterConfig> {
    if !path.exists() {
        return Err(SqlPulseError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| SqlPulseError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, path)?;
    config.validate()?;

    tracing::info!(jobs = config.jobs.len(), queries = config.queries.len(), "Configuration loaded");
    Ok(config)
}

/// Parse configuration from string content
///
/// # Errors
/// Returns `SqlPulseError::Config` if the format is unsupported or parsing
/// fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<ExporterConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("yml");

    match extension {
        "yml" | "yaml" => serde_yaml::from_str(contents)
            .map_err(|e| SqlPulseError::Config(format!("Invalid YAML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SqlPulseError::Config(format!("Invalid JSON format: {}", e))),
        "toml" => toml::from_str(contents)
            .map_err(|e| SqlPulseError::Config(format!("Invalid TOML format: {}", e))),
        _ => Err(SqlPulseError::Config(format!("Unsupported config format: {}", extension))),
    }
}
