//! Error types used throughout the exporter

use thiserror::Error;

/// Main error type for SQLPulse
///
/// Variants follow the failure scopes of the collector: a configuration error
/// is fatal at startup, every other variant is contained to one URL, one
/// connection, one query or one cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlPulseError {
    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single connection URL could not be parsed.
    #[error("Failed to parse URL {url}: {reason}")]
    ConnectionParse { url: String, reason: String },

    /// The database could not be reached or a startup statement failed.
    #[error("Connect error: {0}")]
    Connect(String),

    /// A metric descriptor was invalid or already registered.
    #[error("Descriptor registration error: {0}")]
    DescriptorRegistration(String),

    /// The query failed on the database or its rows could not be mapped.
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// No query ran successfully on any connection of a job.
    #[error("zero queries ran")]
    CycleExhausted,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for SQLPulse operations
pub type Result<T> = std::result::Result<T, SqlPulseError>;

impl SqlPulseError {
    /// Stable label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SqlPulseError::Config(_) => "config",
            SqlPulseError::ConnectionParse { .. } => "connection_parse",
            SqlPulseError::Connect(_) => "connect",
            SqlPulseError::DescriptorRegistration(_) => "descriptor_registration",
            SqlPulseError::QueryExecution(_) => "query_execution",
            SqlPulseError::CycleExhausted => "cycle_exhausted",
            SqlPulseError::Internal(_) => "internal",
        }
    }
}
