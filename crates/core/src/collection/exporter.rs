//! Collector facade over all jobs
//!
//! The exporter owns every job, answers describe/collect for the metrics
//! registry from cached state only, and exposes the diagnostic history of
//! jobs and queries.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use sqlpulse_common::{DiagnosticSink, LogEntry, RotatingLog};
use sqlpulse_domain::ExporterConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::context::CollectorContext;
use super::job::Job;

/// Diagnostic state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub name: String,
    pub last_is_error: bool,
    pub queries: Vec<QueryStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub name: String,
    pub enabled: bool,
    pub last_is_error: bool,
}

struct ExporterInner {
    jobs: Vec<Arc<Job>>,
    log: Arc<RotatingLog>,
}

/// Cheap to clone; clones share the jobs and their caches.
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<ExporterInner>,
}

impl Exporter {
    /// Build every job of `config`. Query descriptors go through
    /// `context.catalog`, which registers the duration summaries; the
    /// exporter itself is registered by the caller.
    pub fn new(config: &ExporterConfig, context: &CollectorContext) -> Self {
        let jobs = config
            .jobs
            .iter()
            .cloned()
            .map(|job| Job::new(job, &config.queries, context))
            .collect();
        Self { inner: Arc::new(ExporterInner { jobs, log: context.log.clone() }) }
    }

    pub fn jobs(&self) -> &[Arc<Job>] {
        &self.inner.jobs
    }

    pub fn job(&self, name: &str) -> Option<&Arc<Job>> {
        self.inner.jobs.iter().find(|job| job.name() == name)
    }

    /// Root diagnostic log.
    pub fn log(&self) -> &Arc<RotatingLog> {
        &self.inner.log
    }

    /// Warnings and errors recorded anywhere in the exporter.
    pub fn error_count(&self) -> u64 {
        self.inner.log.error_count()
    }

    pub fn job_history(&self, job: &str) -> Option<Vec<String>> {
        self.job(job).map(|job| job.log().history())
    }

    pub fn query_history(&self, job: &str, query: &str) -> Option<Vec<String>> {
        self.job(job)?.query(query).map(|query| query.log().history())
    }

    pub fn job_last_is_error(&self, job: &str) -> Option<bool> {
        self.job(job).map(|job| job.log().last_is_error())
    }

    pub fn query_last_is_error(&self, job: &str, query: &str) -> Option<bool> {
        self.job(job)?.query(query).map(|query| query.log().last_is_error())
    }

    /// Last-is-error flags of every job and query, in configuration order.
    pub fn status(&self) -> Vec<JobStatus> {
        self.inner
            .jobs
            .iter()
            .map(|job| JobStatus {
                name: job.name().to_string(),
                last_is_error: job.log().last_is_error(),
                queries: job
                    .queries()
                    .iter()
                    .map(|query| QueryStatus {
                        name: query.name().to_string(),
                        enabled: query.is_enabled(),
                        last_is_error: query.log().last_is_error(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Whether any query has a descriptor, i.e. whether the exporter has
    /// anything to register.
    pub fn has_enabled_queries(&self) -> bool {
        self.inner.jobs.iter().any(|job| job.queries().iter().any(|query| query.is_enabled()))
    }

    /// Spawn one long-lived task per job.
    pub fn run(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.inner
            .jobs
            .iter()
            .map(|job| tokio::spawn(Arc::clone(job).run(cancel.clone())))
            .collect()
    }

    /// Run one cycle of every job concurrently and wait for all of them.
    pub async fn run_once(&self) {
        let cycles = self.inner.jobs.iter().map(|job| {
            let job = Arc::clone(job);
            async move { job.run_once_logged().await }
        });
        futures::future::join_all(cycles).await;
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = Vec::new();
        for job in &self.inner.jobs {
            for query in job.queries() {
                match query.descriptors() {
                    Some(descriptors) => {
                        descs.push(&descriptors.value);
                        descs.push(&descriptors.errors);
                    }
                    None => {
                        query.log().record(&LogEntry::error("Skipping query. Collector is nil"));
                    }
                }
            }
        }
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.inner
            .jobs
            .iter()
            .flat_map(|job| job.queries().iter())
            .filter(|query| query.is_enabled())
            .flat_map(|query| query.collect())
            .collect()
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter").field("jobs", &self.inner.jobs).finish_non_exhaustive()
    }
}
