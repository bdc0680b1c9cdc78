//! Job and query diagnostic history

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobLogsResponse {
    pub job: String,
    pub found: bool,
    pub logs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryLogsResponse {
    pub job: String,
    pub query: String,
    pub found: bool,
    pub logs: Vec<String>,
}

/// `GET /job_logs?job=<name>`
pub async fn job_logs(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<LogsParams>,
) -> Json<JobLogsResponse> {
    let history = ctx.exporter.job_history(&params.job);
    Json(JobLogsResponse {
        found: history.is_some(),
        logs: history.unwrap_or_default(),
        job: params.job,
    })
}

/// `GET /query_logs?job=<name>&query=<name>`
pub async fn query_logs(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<LogsParams>,
) -> Json<QueryLogsResponse> {
    let history = ctx.exporter.query_history(&params.job, &params.query);
    Json(QueryLogsResponse {
        found: history.is_some(),
        logs: history.unwrap_or_default(),
        job: params.job,
        query: params.query,
    })
}
