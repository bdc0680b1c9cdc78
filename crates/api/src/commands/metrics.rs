//! Prometheus exposition

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use prometheus::{Encoder, Registry, TextEncoder};

use crate::context::AppContext;
use crate::errors::ServerError;

/// Render every metric family of `registry` in the text format.
///
/// # Errors
/// Returns `ServerError::Encode` if a family cannot be encoded.
pub fn encode_registry(registry: &Registry) -> Result<String, ServerError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ServerError::Encode(e.to_string()))
}

/// Serves the telemetry path. Reads cached values only.
pub async fn metrics(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, ServerError> {
    let body = encode_registry(&ctx.registry)?;
    Ok(([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
