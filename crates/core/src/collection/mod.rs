//! Collection engine: connections, queries, jobs and the collector facade

pub mod connection;
pub mod context;
pub mod exporter;
pub mod job;
pub mod ports;
pub mod query;

pub use connection::Connection;
pub use context::CollectorContext;
pub use exporter::{Exporter, JobStatus, QueryStatus};
pub use job::{Job, CONNECTION_SPAN};
pub use ports::{
    ConnectTarget, Connector, PoolOptions, SharedConnector, SqlHandle, SqlRow, SqlValue,
};
pub use query::{Observation, Query};
