//! sqlx-backed connector
//!
//! Each connection of a job gets its own pool of the driver's native type,
//! opened from the configured URL. Rows come back as driver-neutral
//! [`SqlRow`]s.
//!
//! Columns are decoded one at a time with the driver's own type mapping.
//! PostgreSQL `NUMERIC` and MySQL `DECIMAL` arrive as exact decimal text.
//! A column no decoder accepts becomes [`SqlValue::Unsupported`] and is left
//! for the query to skip; the rest of the row is still usable.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlpulse_core::{ConnectTarget, Connector, PoolOptions, SqlHandle, SqlRow, SqlValue};
use sqlpulse_domain::{Result, SqlPulseError};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::pool::PoolOptions as SqlxPoolOptions;
use sqlx::postgres::{PgPool, PgRow, PgValueFormat};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{Column, ColumnIndex, Database, Decode, Pool, Row, Type, TypeInfo, ValueRef};

use crate::errors::{connect_error, InfraError};

/// URL schemes with a compiled-in driver.
pub const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql", "mysql", "sqlite"];

/// Default wait for a pooled connection.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens sqlx pools for connection targets.
///
/// sqlx parses the URL itself, so only [`ConnectTarget::url`] is used here.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    acquire_timeout: Duration,
}

impl SqlxConnector {
    pub fn new() -> Self {
        Self { acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    async fn open<DB: Database>(&self, url: &str, options: &PoolOptions) -> Result<Pool<DB>> {
        // sqlx keeps idle connections inside max_connections; there is no
        // separate idle cap.
        SqlxPoolOptions::<DB>::new()
            .max_connections(options.max_open.max(1))
            .min_connections(0)
            .max_lifetime(options.max_lifetime)
            .acquire_timeout(self.acquire_timeout)
            .connect(url)
            .await
            .map_err(connect_error)
    }
}

impl Default for SqlxConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(
        &self,
        target: &ConnectTarget,
        options: &PoolOptions,
    ) -> Result<Arc<dyn SqlHandle>> {
        let pool = match target.driver.as_str() {
            "postgres" | "postgresql" => DriverPool::Postgres(self.open(&target.url, options).await?),
            "mysql" => DriverPool::MySql(self.open(&target.url, options).await?),
            "sqlite" => DriverPool::Sqlite(self.open(&target.url, options).await?),
            other => {
                return Err(SqlPulseError::Connect(format!(
                    "no driver available for scheme {other}"
                )))
            }
        };

        tracing::debug!(driver = %target.driver, max_lifetime = ?options.max_lifetime, "Opened connection pool");
        Ok(Arc::new(SqlxHandle { pool }))
    }
}

enum DriverPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

struct SqlxHandle {
    pool: DriverPool,
}

#[async_trait]
impl SqlHandle for SqlxHandle {
    async fn execute(&self, sql: &str) -> Result<()> {
        let result = match &self.pool {
            DriverPool::Postgres(pool) => sqlx::raw_sql(sql).execute(pool).await.map(drop),
            DriverPool::MySql(pool) => sqlx::raw_sql(sql).execute(pool).await.map(drop),
            DriverPool::Sqlite(pool) => sqlx::raw_sql(sql).execute(pool).await.map(drop),
        };
        result.map_err(InfraError::from)?;
        Ok(())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<SqlRow>> {
        let rows = match &self.pool {
            DriverPool::Postgres(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map(|rows| convert_rows(&rows, decode_postgres)),
            DriverPool::MySql(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map(|rows| convert_rows(&rows, decode_mysql)),
            DriverPool::Sqlite(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map(|rows| convert_rows(&rows, decode_sqlite)),
        };
        Ok(rows.map_err(InfraError::from)?)
    }

    async fn close(&self) {
        match &self.pool {
            DriverPool::Postgres(pool) => pool.close().await,
            DriverPool::MySql(pool) => pool.close().await,
            DriverPool::Sqlite(pool) => pool.close().await,
        }
    }
}

fn convert_rows<R: Row>(rows: &[R], decode: fn(&R, usize) -> Option<SqlValue>) -> Vec<SqlRow> {
    rows.iter()
        .map(|row| {
            let mut converted = SqlRow::new();
            for column in row.columns() {
                let value = decode(row, column.ordinal()).unwrap_or_else(|| {
                    SqlValue::Unsupported(column.type_info().name().to_string())
                });
                converted.push(column.name(), value);
            }
            converted
        })
        .collect()
}

/// Decode a nullable `T`, or `None` when the column type is incompatible.
fn decode<'r, R, T>(row: &'r R, index: usize, wrap: impl FnOnce(T) -> SqlValue) -> Option<SqlValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<Option<T>, _>(index).ok().map(|value| value.map_or(SqlValue::Null, wrap))
}

fn decode_postgres(row: &PgRow, index: usize) -> Option<SqlValue> {
    decode(row, index, SqlValue::Int)
        .or_else(|| decode(row, index, |v: i32| SqlValue::Int(v.into())))
        .or_else(|| decode(row, index, |v: i16| SqlValue::Int(v.into())))
        .or_else(|| decode(row, index, SqlValue::Float))
        .or_else(|| decode(row, index, |v: f32| SqlValue::Float(v.into())))
        .or_else(|| decode(row, index, SqlValue::Bool))
        .or_else(|| decode(row, index, SqlValue::Text))
        .or_else(|| postgres_numeric(row, index))
        .or_else(|| decode_temporal(row, index))
        .or_else(|| decode(row, index, SqlValue::Bytes))
}

fn decode_mysql(row: &MySqlRow, index: usize) -> Option<SqlValue> {
    decode(row, index, SqlValue::Int)
        .or_else(|| decode(row, index, unsigned))
        .or_else(|| decode(row, index, SqlValue::Float))
        .or_else(|| decode(row, index, |v: f32| SqlValue::Float(v.into())))
        .or_else(|| decode(row, index, SqlValue::Bool))
        .or_else(|| decode(row, index, SqlValue::Text))
        .or_else(|| mysql_decimal(row, index))
        .or_else(|| decode_temporal(row, index))
        .or_else(|| decode(row, index, SqlValue::Bytes))
}

fn decode_sqlite(row: &SqliteRow, index: usize) -> Option<SqlValue> {
    decode(row, index, SqlValue::Int)
        .or_else(|| decode(row, index, SqlValue::Float))
        .or_else(|| decode(row, index, SqlValue::Bool))
        .or_else(|| decode(row, index, SqlValue::Text))
        .or_else(|| decode(row, index, SqlValue::Bytes))
}

/// Timestamps and dates render as ISO-8601 text, usable as label values.
fn decode_temporal<'r, R>(row: &'r R, index: usize) -> Option<SqlValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
{
    decode(row, index, |v: DateTime<Utc>| SqlValue::Text(v.to_rfc3339()))
        .or_else(|| decode(row, index, |v: NaiveDateTime| SqlValue::Text(v.to_string())))
        .or_else(|| decode(row, index, |v: NaiveDate| SqlValue::Text(v.to_string())))
}

fn unsigned(value: u64) -> SqlValue {
    i64::try_from(value).map_or(SqlValue::Float(value as f64), SqlValue::Int)
}

fn postgres_numeric(row: &PgRow, index: usize) -> Option<SqlValue> {
    if row.columns().get(index)?.type_info().name() != "NUMERIC" {
        return None;
    }
    let raw = row.try_get_raw(index).ok()?;
    if raw.is_null() {
        return Some(SqlValue::Null);
    }
    let text = match raw.format() {
        PgValueFormat::Text => raw.as_str().ok()?.to_string(),
        PgValueFormat::Binary => numeric_text(raw.as_bytes().ok()?)?,
    };
    Some(SqlValue::Text(text))
}

/// MySQL sends DECIMAL as text on both protocols.
fn mysql_decimal(row: &MySqlRow, index: usize) -> Option<SqlValue> {
    if row.columns().get(index)?.type_info().name() != "DECIMAL" {
        return None;
    }
    row.try_get_unchecked::<Option<String>, _>(index)
        .ok()
        .map(|value| value.map_or(SqlValue::Null, SqlValue::Text))
}

const NUMERIC_NEGATIVE: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;

/// Render a binary PostgreSQL NUMERIC as decimal text.
///
/// Layout: digit count, weight, sign and display scale as 16-bit words,
/// followed by the base-10000 digits, most significant first. The weight is
/// the power of 10000 of the first digit.
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |at: usize| bytes.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(2)? as i16);
    let sign = word(4)?;
    let scale = usize::from(word(6)?);
    if sign == NUMERIC_NAN {
        return Some("NaN".to_string());
    }
    let digits = (0..ndigits).map(|i| word(8 + 2 * i)).collect::<Option<Vec<u16>>>()?;
    let digit = |power: i32| {
        usize::try_from(weight - power).ok().and_then(|i| digits.get(i).copied()).unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEGATIVE {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        let _ = write!(out, "{}", digit(weight));
        for power in (0..weight).rev() {
            let _ = write!(out, "{:04}", digit(power));
        }
    }
    if scale > 0 {
        let mut fraction = String::new();
        let mut power = -1;
        while fraction.len() < scale {
            let _ = write!(fraction, "{:04}", digit(power));
            power -= 1;
        }
        fraction.truncate(scale);
        out.push('.');
        out.push_str(&fraction);
    }
    Some(out)
}
