//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Gauge, Opts, Registry};
use sqlpulse_common::{RotatingLog, SharedSink, TracingTracer};
use sqlpulse_core::{CollectorContext, Exporter, SharedConnector};
use sqlpulse_domain::constants::{
    BUILD_INFO_METRIC, DEFAULT_TELEMETRY_PATH, JOB_TEST_TIMEOUT_SECS,
};
use sqlpulse_domain::{ExporterConfig, Result, SqlPulseError};

/// Application context - holds the exporter and everything the HTTP
/// handlers need
pub struct AppContext {
    pub exporter: Exporter,
    pub registry: Registry,
    pub log: Arc<RotatingLog>,
    /// Connector used by on-demand job tests.
    pub connector: SharedConnector,
    pub telemetry_path: String,
    pub job_test_timeout: Duration,
}

impl AppContext {
    /// Build every job and register the exporter, the duration summaries and
    /// the build info gauge into a fresh registry.
    ///
    /// Queries whose metrics clash with an earlier query or with build info
    /// are disabled while jobs are built, so the exporter's descriptors are
    /// always registrable. `console` receives every diagnostic entry after
    /// the root log.
    ///
    /// # Errors
    /// Returns `SqlPulseError::DescriptorRegistration` only if the registry
    /// still refuses the build info gauge or the exporter.
    pub fn new(
        config: &ExporterConfig,
        connector: SharedConnector,
        history_limit: usize,
        console: SharedSink,
    ) -> Result<Self> {
        let registry = Registry::new();
        let log = Arc::new(RotatingLog::new(history_limit, console));

        let build_info = register_build_info(&registry)?;

        let collector = CollectorContext::new(connector.clone(), registry.clone(), log.clone())
            .with_tracer(Arc::new(TracingTracer));
        collector.catalog.reserve(&build_info.desc())?;
        let exporter = Exporter::new(config, &collector);

        if exporter.has_enabled_queries() {
            registry.register(Box::new(exporter.clone())).map_err(|e| {
                SqlPulseError::DescriptorRegistration(format!("failed to register exporter: {e}"))
            })?;
        } else {
            tracing::warn!("No enabled queries, only process metrics will be exported");
        }

        Ok(Self {
            exporter,
            registry,
            log,
            connector,
            telemetry_path: DEFAULT_TELEMETRY_PATH.to_string(),
            job_test_timeout: Duration::from_secs(JOB_TEST_TIMEOUT_SECS),
        })
    }

    pub fn with_telemetry_path(mut self, path: impl Into<String>) -> Self {
        self.telemetry_path = path.into();
        self
    }

    pub fn with_job_test_timeout(mut self, timeout: Duration) -> Self {
        self.job_test_timeout = timeout;
        self
    }
}

fn register_build_info(registry: &Registry) -> Result<Gauge> {
    let opts = Opts::new(
        BUILD_INFO_METRIC,
        "A metric with a constant '1' value labeled by the version sqlpulse was built from.",
    )
    .const_label("version", env!("CARGO_PKG_VERSION"));

    let gauge = Gauge::with_opts(opts)
        .map_err(|e| SqlPulseError::DescriptorRegistration(e.to_string()))?;
    gauge.set(1.0);
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| SqlPulseError::DescriptorRegistration(e.to_string()))?;
    Ok(gauge)
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("exporter", &self.exporter)
            .field("telemetry_path", &self.telemetry_path)
            .field("job_test_timeout", &self.job_test_timeout)
            .finish_non_exhaustive()
    }
}
