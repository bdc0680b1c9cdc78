//! Metric descriptor builder
//!
//! The label order fixed here is the order label values must be supplied in
//! on every observation: declared labels first, then the connection identity,
//! then the value column name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prometheus::core::Desc;
use regex::Regex;
use sqlpulse_domain::constants::{
    CONST_LABEL_JOB, CONST_LABEL_QUERY, LABEL_COLUMN, LABEL_DATABASE, LABEL_DRIVER, LABEL_HOST,
    LABEL_USER, METRIC_NAME_PREFIX, QUERY_ERRORS_HELP, QUERY_ERRORS_METRIC,
};
use sqlpulse_domain::{QueryConfig, Result, SqlPulseError};

static INVALID_METRIC_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[^a-zA-Z0-9_:]+").expect("INVALID_METRIC_CHARS should compile - this is a bug")
});

/// `sql_<query name>` with characters outside `[a-zA-Z0-9_:]` removed.
pub fn metric_name(query_name: &str) -> String {
    let raw = format!("{METRIC_NAME_PREFIX}{query_name}");
    INVALID_METRIC_CHARS.replace_all(&raw, "").into_owned()
}

/// Declared labels followed by `driver, host, database, user, col`.
pub fn variable_labels(declared: &[String]) -> Vec<String> {
    let mut labels = Vec::with_capacity(declared.len() + 5);
    labels.extend(declared.iter().cloned());
    labels.extend(
        [LABEL_DRIVER, LABEL_HOST, LABEL_DATABASE, LABEL_USER, LABEL_COLUMN]
            .iter()
            .map(|label| (*label).to_string()),
    );
    labels
}

/// Immutable metric identity of one query.
#[derive(Debug, Clone)]
pub struct QueryDescriptors {
    pub name: String,
    pub help: String,
    pub job: String,
    pub query: String,
    pub variable_labels: Vec<String>,
    /// Descriptor of the value gauges.
    pub value: Desc,
    /// Descriptor of the `sql_query_errors` counter.
    pub errors: Desc,
}

impl QueryDescriptors {
    /// Build both descriptors for `query` owned by `job`.
    ///
    /// An empty help text falls back to the metric name, since the exposition
    /// format requires one.
    ///
    /// # Errors
    /// Returns `SqlPulseError::DescriptorRegistration` when a label name is
    /// invalid or repeated.
    pub fn build(job: &str, query: &QueryConfig) -> Result<Self> {
        let name = metric_name(&query.name);
        let help = if query.help.trim().is_empty() { name.clone() } else { query.help.clone() };
        let variable_labels = variable_labels(&query.labels);

        let mut value_const = HashMap::new();
        value_const.insert(CONST_LABEL_JOB.to_string(), job.to_string());
        let value = Desc::new(name.clone(), help.clone(), variable_labels.clone(), value_const)
            .map_err(|err| registration_error(&name, &err))?;

        let mut error_const = HashMap::new();
        error_const.insert(CONST_LABEL_JOB.to_string(), job.to_string());
        error_const.insert(CONST_LABEL_QUERY.to_string(), query.name.clone());
        let errors = Desc::new(
            QUERY_ERRORS_METRIC.to_string(),
            QUERY_ERRORS_HELP.to_string(),
            Vec::new(),
            error_const,
        )
        .map_err(|err| registration_error(QUERY_ERRORS_METRIC, &err))?;

        Ok(Self {
            name,
            help,
            job: job.to_string(),
            query: query.name.clone(),
            variable_labels,
            value,
            errors,
        })
    }
}

fn registration_error(name: &str, err: &prometheus::Error) -> SqlPulseError {
    SqlPulseError::DescriptorRegistration(format!("{name}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str, labels: &[&str]) -> QueryConfig {
        QueryConfig {
            name: name.to_string(),
            help: "help".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: vec!["v".to_string()],
            query: "SELECT 1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn metric_name_strips_invalid_characters() {
        assert_eq!(metric_name("running_queries"), "sql_running_queries");
        assert_eq!(metric_name("pg-stat activity!"), "sql_pgstatactivity");
        assert_eq!(metric_name("ns:rate_5m"), "sql_ns:rate_5m");
        assert_eq!(metric_name("ä"), "sql_");
    }

    #[test]
    fn connection_identity_follows_declared_labels() {
        let labels = variable_labels(&["datname".to_string(), "state".to_string()]);
        assert_eq!(labels, vec!["datname", "state", "driver", "host", "database", "user", "col"]);
    }

    #[test]
    fn builds_value_and_error_descriptors() {
        let descriptors = QueryDescriptors::build("pg", &query("activity", &["datname"]))
            .expect("descriptor should build");

        assert_eq!(descriptors.value.fq_name, "sql_activity");
        assert_eq!(descriptors.value.help, "help");
        assert_eq!(descriptors.value.variable_labels, descriptors.variable_labels);
        assert_eq!(descriptors.value.const_label_pairs.len(), 1);
        assert_eq!(descriptors.value.const_label_pairs[0].get_name(), "sql_job");
        assert_eq!(descriptors.value.const_label_pairs[0].get_value(), "pg");

        assert_eq!(descriptors.errors.fq_name, "sql_query_errors");
        let names: Vec<&str> =
            descriptors.errors.const_label_pairs.iter().map(|p| p.get_name()).collect();
        assert_eq!(names, vec!["sql_job", "sql_query"]);
    }

    #[test]
    fn empty_help_falls_back_to_name() {
        let mut config = query("activity", &[]);
        config.help.clear();
        let descriptors = QueryDescriptors::build("pg", &config).expect("descriptor should build");
        assert_eq!(descriptors.help, "sql_activity");
    }

    #[test]
    fn clashing_label_is_a_registration_error() {
        let result = QueryDescriptors::build("pg", &query("activity", &["col"]));
        assert!(matches!(result, Err(SqlPulseError::DescriptorRegistration(_))));

        let result = QueryDescriptors::build("pg", &query("activity", &["bad-label"]));
        assert!(matches!(result, Err(SqlPulseError::DescriptorRegistration(_))));
    }
}
