//! Conversions from external infrastructure errors into domain errors.

use sqlpulse_domain::SqlPulseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub SqlPulseError);

impl From<InfraError> for SqlPulseError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

trait IntoSqlPulseError {
    fn into_sqlpulse(self) -> SqlPulseError;
}

/* -------------------------------------------------------------------------- */
/* sqlx::Error → SqlPulseError */
/* -------------------------------------------------------------------------- */

impl IntoSqlPulseError for SqlxError {
    fn into_sqlpulse(self) -> SqlPulseError {
        match self {
            SqlxError::Configuration(cause) => {
                SqlPulseError::Connect(format!("invalid connection options: {cause}"))
            }
            SqlxError::Io(err) => SqlPulseError::Connect(format!("i/o error: {err}")),
            SqlxError::Tls(cause) => SqlPulseError::Connect(format!("tls error: {cause}")),
            SqlxError::Protocol(message) => {
                SqlPulseError::Connect(format!("protocol error: {message}"))
            }
            SqlxError::PoolTimedOut => {
                SqlPulseError::Connect("timed out waiting for a connection".into())
            }
            SqlxError::PoolClosed => SqlPulseError::Connect("connection pool is closed".into()),
            SqlxError::WorkerCrashed => {
                SqlPulseError::Connect("database worker thread crashed".into())
            }
            SqlxError::Database(err) => match err.code() {
                Some(code) => SqlPulseError::QueryExecution(format!("{} (code {code})", err.message())),
                None => SqlPulseError::QueryExecution(err.message().to_string()),
            },
            SqlxError::RowNotFound => SqlPulseError::QueryExecution("no rows returned".into()),
            SqlxError::ColumnNotFound(column) => {
                SqlPulseError::QueryExecution(format!("column not found: {column}"))
            }
            SqlxError::ColumnDecode { index, source } => {
                SqlPulseError::QueryExecution(format!("failed to decode column {index}: {source}"))
            }
            SqlxError::Decode(cause) => {
                SqlPulseError::QueryExecution(format!("failed to decode value: {cause}"))
            }
            other => SqlPulseError::QueryExecution(other.to_string()),
        }
    }
}

impl From<SqlxError> for InfraError {
    fn from(value: SqlxError) -> Self {
        InfraError(value.into_sqlpulse())
    }
}

/// Map an error raised while establishing a connection.
///
/// Server-side failures at this stage (authentication, unknown database)
/// are connect failures, not query failures.
pub fn connect_error(err: SqlxError) -> SqlPulseError {
    match err.into_sqlpulse() {
        SqlPulseError::QueryExecution(message) => SqlPulseError::Connect(message),
        other => other,
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn transport_failures_map_to_connect() {
        let refused = SqlxError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        let mapped: SqlPulseError = InfraError::from(refused).into();
        match mapped {
            SqlPulseError::Connect(msg) => assert!(msg.contains("refused")),
            other => panic!("expected connect error, got {:?}", other),
        }

        let mapped: SqlPulseError = InfraError::from(SqlxError::PoolTimedOut).into();
        assert!(matches!(mapped, SqlPulseError::Connect(_)));
    }

    #[test]
    fn infra_error_displays_the_domain_error() {
        let err = InfraError::from(SqlPulseError::Connect("refused".into()));
        assert_eq!(err.to_string(), "Connect error: refused");
    }

    #[test]
    fn row_failures_map_to_query_execution() {
        let mapped: SqlPulseError = InfraError::from(SqlxError::ColumnNotFound("count".into())).into();
        assert_eq!(mapped, SqlPulseError::QueryExecution("column not found: count".into()));

        let mapped: SqlPulseError = InfraError::from(SqlxError::RowNotFound).into();
        assert!(matches!(mapped, SqlPulseError::QueryExecution(_)));
    }

    #[test]
    fn connect_stage_promotes_query_errors() {
        let mapped = connect_error(SqlxError::Protocol("bad handshake".into()));
        assert_eq!(mapped, SqlPulseError::Connect("protocol error: bad handshake".into()));

        let mapped = connect_error(SqlxError::ColumnNotFound("x".into()));
        assert_eq!(mapped, SqlPulseError::Connect("column not found: x".into()));
    }
}
