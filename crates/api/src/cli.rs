//! Command line flags

use std::path::PathBuf;

use clap::Parser;
use sqlpulse_domain::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_HISTORY_LIMIT, DEFAULT_LISTEN_ADDRESS, DEFAULT_TELEMETRY_PATH,
};

/// SQLPulse - SQL query results as Prometheus metrics
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlpulse", version)]
pub struct Cli {
    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = DEFAULT_TELEMETRY_PATH)]
    pub telemetry_path: String,

    /// Configuration file
    #[arg(long = "config.file", env = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Check configuration file structure and exit
    #[arg(long = "config.check")]
    pub config_check: bool,

    /// Run every job once, report warnings and errors, and exit
    #[arg(long)]
    pub check: bool,

    /// History limit for job and query logs
    #[arg(long = "history.limit", default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,
}
