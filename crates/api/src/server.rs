//! HTTP server
//!
//! | route | handler |
//! |---|---|
//! | `GET <telemetry path>` | Prometheus text exposition |
//! | `GET /healthz` | liveness |
//! | `GET /` | job and query status |
//! | `GET /job_logs?job=` | job history |
//! | `GET /query_logs?job=&query=` | query history |
//! | `POST /job_test` | one-off job run |

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::commands;
use crate::context::AppContext;
use crate::errors::ServerError;

const RESERVED_PATHS: &[&str] = &["/", "/healthz", "/job_logs", "/query_logs", "/job_test"];

/// Create the router with all routes.
///
/// # Errors
/// Returns `ServerError::InvalidRequest` if the telemetry path does not start
/// with `/` or collides with another route.
pub fn router(ctx: Arc<AppContext>) -> Result<Router, ServerError> {
    let telemetry_path = ctx.telemetry_path.clone();
    if !telemetry_path.starts_with('/') || RESERVED_PATHS.contains(&telemetry_path.as_str()) {
        return Err(ServerError::InvalidRequest(format!(
            "invalid telemetry path: {telemetry_path}"
        )));
    }

    Ok(Router::new()
        .route(&telemetry_path, get(commands::metrics))
        .route("/healthz", get(commands::healthz))
        .route("/", get(commands::index))
        .route("/job_logs", get(commands::job_logs))
        .route("/query_logs", get(commands::query_logs))
        .route("/job_test", post(commands::job_test))
        .with_state(ctx))
}

/// Listen address in a form the socket layer accepts: a bare `:port` binds
/// every interface.
pub fn bind_address(listen: &str) -> String {
    match listen.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => listen.to_string(),
    }
}

/// Serve until `shutdown` is cancelled.
///
/// # Errors
/// Returns `ServerError::Bind` if the address cannot be bound, or the
/// server's I/O error.
pub async fn serve(
    ctx: Arc<AppContext>,
    listen: &str,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let app = router(ctx)?;
    let address = bind_address(listen);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServerError::Bind { address: address.clone(), reason: e.to_string() })?;

    tracing::info!(listen_address = %address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Bind { address, reason: e.to_string() })
}
