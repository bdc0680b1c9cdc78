//! Port interfaces for database access
//!
//! These traits define the boundary between the collection engine and the
//! database driver adapter in `sqlpulse-infra`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlpulse_domain::Result;

/// A single column value, independent of the driver that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// A column the driver could not decode, carrying its type name.
    Unsupported(String),
}

impl SqlValue {
    /// Numeric reading of the value, used for metric samples.
    ///
    /// Text and byte columns are accepted when they hold a decimal number.
    /// The sqlx connector hands NUMERIC/DECIMAL columns over as text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::Float(f) => Some(*f),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            SqlValue::Unsupported(_) => None,
        }
    }

    /// Text rendering of the value, used for label values.
    pub fn to_label(&self) -> String {
        match self {
            SqlValue::Null | SqlValue::Unsupported(_) => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// One result row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append.
    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// Value of the first column with this exact name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// What to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Driver name, the URL scheme.
    pub driver: String,
    /// Scheme-less transport string after scheme-specific rewriting, for
    /// drivers that take Go-style DSNs. URL-based drivers ignore it.
    pub dsn: String,
    /// The configured URL, unmodified.
    pub url: String,
}

/// Driver-level pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_open: u32,
    pub max_idle: u32,
    pub max_lifetime: Duration,
}

/// A live database handle.
#[async_trait]
pub trait SqlHandle: Send + Sync {
    /// Execute a statement, discarding any rows.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query and return every row.
    async fn fetch_all(&self, sql: &str) -> Result<Vec<SqlRow>>;

    /// Release driver resources. The handle must not be used afterwards.
    async fn close(&self);
}

/// Opens database handles.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        target: &ConnectTarget,
        options: &PoolOptions,
    ) -> Result<Arc<dyn SqlHandle>>;
}

/// Shared handle to a connector.
pub type SharedConnector = Arc<dyn Connector>;
