//! Index page: per-job and per-query status

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlpulse_core::JobStatus;

use crate::context::AppContext;

/// # Example Response
/// ```json
/// {
///   "metrics_path": "/metrics",
///   "error_count": 2,
///   "jobs": [
///     {
///       "name": "pg",
///       "last_is_error": false,
///       "queries": [{ "name": "activity", "enabled": true, "last_is_error": false }]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub metrics_path: String,
    pub error_count: u64,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobView {
    pub name: String,
    pub last_is_error: bool,
    pub queries: Vec<QueryView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryView {
    pub name: String,
    pub enabled: bool,
    pub last_is_error: bool,
}

impl From<JobStatus> for JobView {
    fn from(status: JobStatus) -> Self {
        Self {
            name: status.name,
            last_is_error: status.last_is_error,
            queries: status
                .queries
                .into_iter()
                .map(|query| QueryView {
                    name: query.name,
                    enabled: query.enabled,
                    last_is_error: query.last_is_error,
                })
                .collect(),
        }
    }
}

/// `GET /`
pub async fn index(State(ctx): State<Arc<AppContext>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        metrics_path: ctx.telemetry_path.clone(),
        error_count: ctx.exporter.error_count(),
        jobs: ctx.exporter.status().into_iter().map(JobView::from).collect(),
    })
}
