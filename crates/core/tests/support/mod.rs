//! Shared fakes for core integration tests
//!
//! `FakeConnector` hands out one shared `FakeHandle`. Results are scripted on
//! the handle: queued results are consumed first, then the default rows are
//! returned on every fetch.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prometheus::proto::{Metric, MetricFamily};
use prometheus::Registry;
use sqlpulse_common::{NullSink, RotatingLog, TraceSpan, Tracer};
use sqlpulse_core::{
    CollectorContext, ConnectTarget, Connector, PoolOptions, SqlHandle, SqlRow, SqlValue,
};
use sqlpulse_domain::{JobConfig, QueryConfig, Result, SqlPulseError};

#[derive(Default)]
pub struct FakeHandle {
    queued: Mutex<VecDeque<Result<Vec<SqlRow>>>>,
    rows: Mutex<Vec<SqlRow>>,
    failing_statements: Mutex<HashSet<String>>,
    executed: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    closes: AtomicUsize,
}

impl FakeHandle {
    pub fn returning(rows: Vec<SqlRow>) -> Arc<Self> {
        let handle = Self::default();
        *handle.rows.lock().expect("rows lock") = rows;
        Arc::new(handle)
    }

    pub fn set_rows(&self, rows: Vec<SqlRow>) {
        *self.rows.lock().expect("rows lock") = rows;
    }

    pub fn push_result(&self, result: Result<Vec<SqlRow>>) {
        self.queued.lock().expect("queue lock").push_back(result);
    }

    pub fn fail_statement(&self, sql: &str) {
        self.failing_statements.lock().expect("statements lock").insert(sql.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("executed lock").clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlHandle for FakeHandle {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.executed.lock().expect("executed lock").push(sql.to_string());
        if self.failing_statements.lock().expect("statements lock").contains(sql) {
            return Err(SqlPulseError::QueryExecution(format!("statement failed: {sql}")));
        }
        Ok(())
    }

    async fn fetch_all(&self, _sql: &str) -> Result<Vec<SqlRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.queued.lock().expect("queue lock").pop_front() {
            return result;
        }
        Ok(self.rows.lock().expect("rows lock").clone())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    handle: Arc<FakeHandle>,
    failing_hosts: Mutex<HashSet<String>>,
    targets: Mutex<Vec<(ConnectTarget, PoolOptions)>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(handle: Arc<FakeHandle>) -> Arc<Self> {
        Arc::new(Self {
            handle,
            failing_hosts: Mutex::new(HashSet::new()),
            targets: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
        })
    }

    /// Connecting to any URL containing `host` fails.
    pub fn fail_host(&self, host: &str) {
        self.failing_hosts.lock().expect("hosts lock").insert(host.to_string());
    }

    pub fn heal_host(&self, host: &str) {
        self.failing_hosts.lock().expect("hosts lock").remove(host);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<(ConnectTarget, PoolOptions)> {
        self.targets.lock().expect("targets lock").clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        target: &ConnectTarget,
        options: &PoolOptions,
    ) -> Result<Arc<dyn SqlHandle>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().expect("targets lock").push((target.clone(), *options));
        let refused = self
            .failing_hosts
            .lock()
            .expect("hosts lock")
            .iter()
            .any(|host| target.url.contains(host.as_str()));
        if refused {
            return Err(SqlPulseError::Connect(format!("connection refused: {}", target.url)));
        }
        Ok(self.handle.clone() as Arc<dyn SqlHandle>)
    }
}

/// Tracer that remembers every span it started.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    spans: Mutex<Vec<String>>,
}

impl RecordingTracer {
    pub fn spans(&self) -> Vec<String> {
        self.spans.lock().expect("spans lock").clone()
    }
}

impl Tracer for RecordingTracer {
    fn start_span(&self, operation: &str, metadata: HashMap<String, String>) -> TraceSpan {
        self.spans.lock().expect("spans lock").push(operation.to_string());
        TraceSpan { operation: operation.to_string(), metadata, ..TraceSpan::default() }
    }
}

pub fn context(connector: Arc<FakeConnector>) -> CollectorContext {
    let root = Arc::new(RotatingLog::new(100, Arc::new(NullSink)));
    CollectorContext::new(connector, Registry::new(), root)
}

pub fn job(name: &str, urls: &[&str], queries: Vec<QueryConfig>) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        keepalive: true,
        interval: Duration::from_secs(5),
        conn_max_lifetime: None,
        connections: urls.iter().map(|url| url.to_string()).collect(),
        queries,
        startup_sql: Vec::new(),
    }
}

pub fn query(name: &str, labels: &[&str], values: &[&str]) -> QueryConfig {
    QueryConfig {
        name: name.to_string(),
        help: format!("{name} help"),
        labels: labels.iter().map(|label| label.to_string()).collect(),
        values: values.iter().map(|value| value.to_string()).collect(),
        query: format!("SELECT * FROM {name}"),
        query_ref: String::new(),
    }
}

pub fn row(columns: &[(&str, SqlValue)]) -> SqlRow {
    columns.iter().fold(SqlRow::new(), |row, (name, value)| row.with(*name, value.clone()))
}

pub fn no_named_queries() -> BTreeMap<String, String> {
    BTreeMap::new()
}

pub fn family<'a>(families: &'a [MetricFamily], name: &str) -> Option<&'a MetricFamily> {
    families.iter().find(|family| family.get_name() == name)
}

/// Label pairs of a metric as a name → value map.
pub fn labels(metric: &Metric) -> BTreeMap<String, String> {
    metric
        .get_label()
        .iter()
        .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
        .collect()
}

pub fn history_contains(history: &[String], needle: &str) -> bool {
    history.iter().any(|line| line.contains(needle))
}
