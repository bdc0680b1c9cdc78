//! HTTP handlers
//!
//! All handlers read from [`AppContext`](crate::AppContext); none of them
//! touch the databases except the job test.

pub mod health;
pub mod logs;
pub mod metrics;
pub mod status;

pub use health::healthz;
pub use job_test::{job_test, JobTestRequest, JobTestResponse};
pub use logs::{job_logs, query_logs, JobLogsResponse, QueryLogsResponse};
pub use metrics::{encode_registry, metrics};
pub use status::{index, StatusResponse};
