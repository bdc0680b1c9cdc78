//! Query execution and the last-known-value cache
//!
//! A query owns its metric identity, its duration summary, a diagnostic log
//! and a cache of the observations of the most recent successful run on each
//! connection. Collection reads the cache only.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Counter, GaugeVec, Opts};
use sqlpulse_common::{DiagnosticSink, LogEntry, RotatingLog, SharedSink};
use sqlpulse_domain::constants::{
    CONST_LABEL_JOB, CONST_LABEL_QUERY, QUERY_ERRORS_HELP, QUERY_ERRORS_METRIC,
};
use sqlpulse_domain::{QueryConfig, Result, SqlPulseError};

use super::connection::Connection;
use super::ports::{SqlRow, SqlValue};
use crate::metrics::{DescriptorCatalog, DurationSummary, QueryDescriptors};

/// One sample: label values in descriptor order and the numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A configured query bound to its job.
pub struct Query {
    config: QueryConfig,
    sql: String,
    descriptors: Option<QueryDescriptors>,
    durations: Option<DurationSummary>,
    cache: RwLock<BTreeMap<usize, Vec<Observation>>>,
    log: Arc<RotatingLog>,
}

impl Query {
    /// Resolve the SQL text, build the descriptors and admit them into the
    /// catalog, which registers the duration summary.
    ///
    /// Never fails: an empty query text or descriptors clashing with another
    /// query's leave the query disabled, recorded on its log.
    pub fn new(
        job: &str,
        config: QueryConfig,
        named: &BTreeMap<String, String>,
        catalog: &DescriptorCatalog,
        parent: SharedSink,
        history_limit: usize,
    ) -> Self {
        let log =
            Arc::new(RotatingLog::new(history_limit, parent).with_context("query", &config.name));
        let sql = config.resolve_sql(named);

        let mut query =
            Self { config, sql, descriptors: None, durations: None, cache: RwLock::default(), log };

        if query.sql.trim().is_empty() {
            query.log.record(
                &LogEntry::warn("Skipping empty query").field("query_ref", &query.config.query_ref),
            );
            return query;
        }

        let descriptors = match QueryDescriptors::build(job, &query.config) {
            Ok(descriptors) => descriptors,
            Err(err) => {
                query.log.record(&LogEntry::error("Failed to create descriptor").field("err", &err));
                return query;
            }
        };

        let admitted = DurationSummary::new(job, &query.config.name).and_then(|summary| {
            catalog.admit_query(&descriptors, &summary).map(|()| summary)
        });
        match admitted {
            Ok(summary) => {
                query.descriptors = Some(descriptors);
                query.durations = Some(summary);
            }
            Err(err) => {
                query.log.record(&LogEntry::error("Failed to register metric").field("err", &err));
            }
        }
        query
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Whether the query has a descriptor and takes part in cycles and
    /// collection.
    pub fn is_enabled(&self) -> bool {
        self.descriptors.is_some()
    }

    pub fn descriptors(&self) -> Option<&QueryDescriptors> {
        self.descriptors.as_ref()
    }

    pub fn durations(&self) -> Option<&DurationSummary> {
        self.durations.as_ref()
    }

    pub fn log(&self) -> &Arc<RotatingLog> {
        &self.log
    }

    /// Execute on `connection` and replace that connection's cache entry.
    ///
    /// Row-level problems are logged and the row or value skipped. Returns the
    /// number of observations stored.
    ///
    /// # Errors
    /// Fails when the query is disabled, the connection has no live handle or
    /// the database rejects the query. The previous cache entry is kept on
    /// failure.
    pub async fn run(&self, connection: &Connection) -> Result<usize> {
        if self.descriptors.is_none() {
            return Err(SqlPulseError::QueryExecution("query has no descriptor".into()));
        }
        let handle = connection.handle().await.ok_or_else(|| {
            SqlPulseError::QueryExecution("db connection not initialized".into())
        })?;

        let started = Instant::now();
        let result = handle.fetch_all(&self.sql).await;
        if let Some(durations) = &self.durations {
            durations.observe(started.elapsed());
        }
        let rows = result?;

        let observations = self.observations(&rows, connection);
        let stored = observations.len();
        self.cache.write().insert(connection.index(), observations);
        Ok(stored)
    }

    fn observations(&self, rows: &[SqlRow], connection: &Connection) -> Vec<Observation> {
        let mut out = Vec::with_capacity(rows.len() * self.config.values.len());

        'rows: for row in rows {
            let mut labels = Vec::with_capacity(self.config.labels.len() + 5);
            for label in &self.config.labels {
                let err = match row.get(label) {
                    Some(SqlValue::Unsupported(type_name)) => {
                        format!("unsupported column type {type_name}")
                    }
                    Some(value) => {
                        labels.push(value.to_label());
                        continue;
                    }
                    None => "label column not found".to_string(),
                };
                self.log.record(
                    &LogEntry::warn("Failed to update metrics")
                        .field("column", label)
                        .field("err", err)
                        .field("host", connection.host()),
                );
                continue 'rows;
            }
            labels.extend(connection.identity().iter().map(|part| (*part).to_string()));

            for column in &self.config.values {
                let reason = match row.get(column) {
                    Some(SqlValue::Unsupported(type_name)) => {
                        format!("unsupported column type {type_name}")
                    }
                    Some(value) => match value.as_f64() {
                        Some(value) => {
                            let mut label_values = labels.clone();
                            label_values.push(column.clone());
                            out.push(Observation { label_values, value });
                            continue;
                        }
                        None => "value column is not numeric".to_string(),
                    },
                    None => "value column not found".to_string(),
                };
                self.log.record(
                    &LogEntry::warn("Failed to update metric")
                        .field("value", column)
                        .field("err", reason)
                        .field("host", connection.host()),
                );
            }
        }
        out
    }

    /// Cached observations of every connection, ordered by connection.
    pub fn cached_observations(&self) -> Vec<Observation> {
        self.cache.read().values().flatten().cloned().collect()
    }

    /// Cached value gauges plus the current error counter.
    ///
    /// Disabled queries produce nothing.
    pub fn collect(&self) -> Vec<MetricFamily> {
        let Some(descriptors) = &self.descriptors else {
            return Vec::new();
        };

        let mut families = Vec::with_capacity(2);
        match self.value_gauges(descriptors) {
            Ok(gauges) => families.extend(gauges.collect()),
            Err(err) => self.log.record(
                &LogEntry::error("Failed to collect metric")
                    .field("metric", &descriptors.name)
                    .field("err", err),
            ),
        }
        match self.error_counter(descriptors) {
            Ok(counter) => families.extend(counter.collect()),
            Err(err) => self.log.record(
                &LogEntry::error("Failed to collect metric")
                    .field("metric", QUERY_ERRORS_METRIC)
                    .field("err", err),
            ),
        }
        families
    }

    fn value_gauges(&self, descriptors: &QueryDescriptors) -> prometheus::Result<GaugeVec> {
        let opts = Opts::new(descriptors.name.clone(), descriptors.help.clone())
            .const_label(CONST_LABEL_JOB, descriptors.job.clone());
        let label_names: Vec<&str> =
            descriptors.variable_labels.iter().map(String::as_str).collect();
        let gauges = GaugeVec::new(opts, &label_names)?;

        let cache = self.cache.read();
        for observation in cache.values().flatten() {
            let values: Vec<&str> = observation.label_values.iter().map(String::as_str).collect();
            gauges.get_metric_with_label_values(&values)?.set(observation.value);
        }
        Ok(gauges)
    }

    fn error_counter(&self, descriptors: &QueryDescriptors) -> prometheus::Result<Counter> {
        let opts = Opts::new(QUERY_ERRORS_METRIC, QUERY_ERRORS_HELP)
            .const_label(CONST_LABEL_JOB, descriptors.job.clone())
            .const_label(CONST_LABEL_QUERY, descriptors.query.clone());
        let counter = Counter::with_opts(opts)?;
        counter.inc_by(self.log.error_count() as f64);
        Ok(counter)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("name", &self.config.name)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
