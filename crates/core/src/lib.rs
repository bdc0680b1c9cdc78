//! # SQLPulse Core
//!
//! The collection engine - no driver, HTTP or CLI code.
//!
//! This crate contains:
//! - Port interfaces for database access ([`Connector`], [`SqlHandle`])
//! - Metric identity and duration summaries
//! - Jobs, queries and their scheduling
//! - The [`Exporter`] collector facade
//!
//! ## Architecture Principles
//! - Depends only on `sqlpulse-common` and `sqlpulse-domain`
//! - Database access goes through the ports
//! - Metrics go into an explicit `prometheus::Registry`, never the default one

pub mod collection;
pub mod metrics;

pub use collection::{
    CollectorContext, ConnectTarget, Connection, Connector, Exporter, Job, JobStatus, Observation,
    PoolOptions, Query, QueryStatus, SharedConnector, SqlHandle, SqlRow, SqlValue,
};
pub use metrics::{DescriptorCatalog, DurationSummary, QueryDescriptors};
