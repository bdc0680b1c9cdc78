//! Shared collaborators handed to every job

use std::sync::Arc;

use prometheus::Registry;
use sqlpulse_common::{NoOpTracer, RotatingLog, SharedTracer};

use super::ports::SharedConnector;
use crate::metrics::DescriptorCatalog;

/// Everything a job needs besides its own configuration.
///
/// `log` is the root of the diagnostic tree: job logs forward into it, and its
/// error count is the process-wide error count. `catalog` admits query
/// descriptors into `registry` and registers their duration summaries.
#[derive(Clone)]
pub struct CollectorContext {
    pub connector: SharedConnector,
    pub tracer: SharedTracer,
    pub registry: Registry,
    pub catalog: Arc<DescriptorCatalog>,
    pub log: Arc<RotatingLog>,
    pub history_limit: usize,
}

impl CollectorContext {
    /// Context with the no-op tracer and the root log's capacity as history
    /// limit.
    pub fn new(connector: SharedConnector, registry: Registry, log: Arc<RotatingLog>) -> Self {
        let history_limit = log.capacity();
        let catalog = Arc::new(DescriptorCatalog::new(registry.clone()));
        Self { connector, tracer: Arc::new(NoOpTracer), registry, catalog, log, history_limit }
    }

    pub fn with_tracer(mut self, tracer: SharedTracer) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl std::fmt::Debug for CollectorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorContext")
            .field("tracer", &self.tracer)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}
