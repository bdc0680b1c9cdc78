//! HTTP-facing errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlpulse_domain::SqlPulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request is missing or has malformed fields.
    #[error("{0}")]
    InvalidRequest(String),

    /// The handler did not finish within its time budget.
    #[error("Your request is too long")]
    Timeout,

    #[error("failed to encode metrics: {0}")]
    Encode(String),

    #[error("failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error(transparent)]
    Domain(#[from] SqlPulseError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Encode(_) | ServerError::Bind { .. } | ServerError::Domain(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<prometheus::Error> for ServerError {
    fn from(value: prometheus::Error) -> Self {
        ServerError::Encode(value.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::Timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ServerError::InvalidRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::from(SqlPulseError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::Timeout.to_string(), "Your request is too long");
    }
}
