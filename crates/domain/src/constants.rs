//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! exporter.

// Exposition
pub const METRIC_NAME_PREFIX: &str = "sql_";
pub const QUERY_ERRORS_METRIC: &str = "sql_query_errors";
pub const QUERY_ERRORS_HELP: &str = "Query errors";
pub const QUERY_DURATIONS_METRIC: &str = "sql_query_durations";
pub const QUERY_DURATIONS_HELP: &str = "SQL query durations.";
pub const BUILD_INFO_METRIC: &str = "sql_exporter_build_info";

// Label names appended to every query's declared labels, in this order
pub const LABEL_DRIVER: &str = "driver";
pub const LABEL_HOST: &str = "host";
pub const LABEL_DATABASE: &str = "database";
pub const LABEL_USER: &str = "user";
pub const LABEL_COLUMN: &str = "col";

// Constant labels
pub const CONST_LABEL_JOB: &str = "sql_job";
pub const CONST_LABEL_QUERY: &str = "sql_query";

// Summary objectives (quantile, allowed error)
pub const DURATION_OBJECTIVES: [(f64, f64); 3] = [(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)];

// Process defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9237";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const JOB_TEST_TIMEOUT_SECS: u64 = 60;
