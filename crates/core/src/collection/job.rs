//! Job scheduling
//!
//! A job runs its queries on all of its connections once per cycle:
//!
//! ```text
//! run():  ┌─> retry(run_once, max elapsed = interval) ─> sleep(interval) ─┐
//!         └───────────────────────────────────────────────────────────────┘
//!
//! run_once():  connection 1 ─ connect ─ q1 ─ q2 ─ …  ┐
//!              connection 2 ─ connect ─ q1 ─ q2 ─ …  ├─ join ─> Σ successes
//!              connection n ─ …                      ┘
//! ```
//!
//! A cycle fails only when no query succeeded on any connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sqlpulse_common::{
    retry, DiagnosticSink, ExponentialBackoff, LogEntry, RotatingLog, SharedSink, SharedTracer,
};
use sqlpulse_domain::{JobConfig, Result, SqlPulseError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::connection::Connection;
use super::context::CollectorContext;
use super::ports::SharedConnector;
use super::query::Query;

/// Span opened around each per-connection run.
pub const CONNECTION_SPAN: &str = "job.run_once_connection";

/// A named schedule of queries over a set of connections.
pub struct Job {
    config: JobConfig,
    connections: Vec<Arc<Connection>>,
    queries: Vec<Arc<Query>>,
    log: Arc<RotatingLog>,
    connector: SharedConnector,
    tracer: SharedTracer,
}

impl Job {
    /// Build the job's queries and parse its connection URLs.
    ///
    /// Bad URLs and unusable queries are logged and left out; building never
    /// fails.
    pub fn new(
        config: JobConfig,
        named: &BTreeMap<String, String>,
        context: &CollectorContext,
    ) -> Arc<Self> {
        let log = Arc::new(
            RotatingLog::new(context.history_limit, context.log.clone() as SharedSink)
                .with_context("job", &config.name),
        );

        let queries = config
            .queries
            .iter()
            .cloned()
            .map(|query| {
                Arc::new(Query::new(
                    &config.name,
                    query,
                    named,
                    &context.catalog,
                    log.clone() as SharedSink,
                    context.history_limit,
                ))
            })
            .collect();

        let connections = Connection::prepare(&config.connections, log.as_ref());

        Arc::new(Self {
            config,
            connections,
            queries,
            log,
            connector: context.connector.clone(),
            tracer: context.tracer.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn connections(&self) -> &[Arc<Connection>] {
        &self.connections
    }

    pub fn queries(&self) -> &[Arc<Query>] {
        &self.queries
    }

    pub fn query(&self, name: &str) -> Option<&Arc<Query>> {
        self.queries.iter().find(|query| query.name() == name)
    }

    pub fn log(&self) -> &Arc<RotatingLog> {
        &self.log
    }

    /// Run cycles until `cancel` fires.
    ///
    /// Each cycle is retried with exponential backoff for at most one
    /// interval; whatever the outcome, the loop then sleeps one interval.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.config.interval;
        self.log.record(&LogEntry::debug("Starting"));

        loop {
            let backoff = ExponentialBackoff::with_max_elapsed(interval);
            let job = self.clone();
            let attempt = retry(&backoff, move || {
                let job = job.clone();
                async move { job.run_once().await }
            });

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = attempt => {
                    if let Err(err) = result {
                        self.log.record(&LogEntry::error("Failed to run").field("err", &err));
                    }
                }
            }

            self.log.record(
                &LogEntry::debug("Sleeping until next run").field("sleep", format!("{interval:?}")),
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.log.record(&LogEntry::debug("Stopped"));
    }

    /// Single cycle with the failure recorded on the job log.
    pub async fn run_once_logged(self: &Arc<Self>) {
        if let Err(err) = self.run_once().await {
            self.log.record(&LogEntry::error("Failed to run").field("err", &err));
        }
    }

    /// Run one cycle: every connection concurrently, every enabled query in
    /// order on each of them.
    ///
    /// Returns the number of successful (query, connection) executions.
    ///
    /// # Errors
    /// `SqlPulseError::CycleExhausted` when that number is zero.
    pub async fn run_once(self: &Arc<Self>) -> Result<usize> {
        let mut tasks = JoinSet::new();
        for connection in &self.connections {
            let job = Arc::clone(self);
            let connection = Arc::clone(connection);
            tasks.spawn(async move { job.run_connection(connection).await });
        }

        let mut updated = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(count) => updated += count,
                Err(err) => {
                    self.log.record(&LogEntry::error("Connection task failed").field("err", err));
                }
            }
        }

        if updated < 1 {
            return Err(SqlPulseError::CycleExhausted);
        }
        Ok(updated)
    }

    async fn run_connection(&self, connection: Arc<Connection>) -> usize {
        let mut span = self.tracer.start_span(CONNECTION_SPAN, HashMap::new());
        span.set_tag("job.name", self.config.name.clone());

        let updated = self.run_queries(&connection).await;
        if !self.config.keepalive {
            connection.close().await;
        }

        span.finish();
        updated
    }

    async fn run_queries(&self, connection: &Connection) -> usize {
        if let Err(err) =
            connection.connect(self.connector.as_ref(), &self.config, self.log.as_ref()).await
        {
            self.log.record(
                &LogEntry::warn("Failed to connect")
                    .field("host", connection.host())
                    .field("err", &err),
            );
            return 0;
        }

        let mut updated = 0;
        for query in &self.queries {
            if !query.is_enabled() {
                continue;
            }
            query.log().record(&LogEntry::debug("Running query"));
            match query.run(connection).await {
                Ok(_) => {
                    query.log().record(&LogEntry::debug("Query finished"));
                    updated += 1;
                }
                Err(err) => {
                    query.log().record(
                        &LogEntry::warn("Failed to run query")
                            .field("host", connection.host())
                            .field("err", &err),
                    );
                }
            }
        }
        updated
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.config.name)
            .field("connections", &self.connections)
            .field("queries", &self.queries)
            .finish_non_exhaustive()
    }
}
