//! Integration tests for query execution and the last-known-value cache

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use prometheus::Registry;
use sqlpulse_common::{DiagnosticSink, NullSink, RotatingLog, SharedSink};
use sqlpulse_core::{Connection, DescriptorCatalog, Job, Query, SqlValue};
use sqlpulse_domain::{QueryConfig, SqlPulseError};
use support::{context, family, history_contains, job, query, row, FakeConnector, FakeHandle};

fn standalone(config: QueryConfig, catalog: &DescriptorCatalog) -> Query {
    Query::new("pg", config, &BTreeMap::new(), catalog, Arc::new(NullSink) as SharedSink, 50)
}

async fn connected(url: &str, handle: Arc<FakeHandle>) -> Connection {
    let connection = Connection::parse(0, url).expect("valid url");
    let connector = FakeConnector::new(handle);
    let job = job("pg", &[url], Vec::new());
    connection.connect(connector.as_ref(), &job, &NullSink).await.expect("connect");
    connection
}

fn gauge_values(query: &Query) -> Vec<f64> {
    let families = query.collect();
    family(&families, &format!("sql_{}", query.name()))
        .map(|family| family.get_metric().iter().map(|m| m.get_gauge().get_value()).collect())
        .unwrap_or_default()
}

fn error_counter(query: &Query) -> f64 {
    let families = query.collect();
    family(&families, "sql_query_errors")
        .map(|family| family.get_metric()[0].get_counter().get_value())
        .unwrap_or(-1.0)
}

/// Validates last-known-good semantics.
///
/// # Test Steps
/// 1. Cycle 1 succeeds with value 7
/// 2. Cycle 2 fails on the database
/// 3. Verify collection still shows 7 and the error counter is 1
#[tokio::test]
async fn failed_run_keeps_previous_values() {
    let handle = FakeHandle::returning(vec![row(&[("count", SqlValue::Int(7))])]);
    let ctx = context(FakeConnector::new(handle.clone()));
    let pg = Job::new(
        job("pg", &["postgres://db1/postgres"], vec![query("activity", &[], &["count"])]),
        &BTreeMap::new(),
        &ctx,
    );
    let activity = pg.query("activity").expect("query exists").clone();

    assert_eq!(pg.run_once().await, Ok(1));
    assert_eq!(gauge_values(&activity), vec![7.0]);
    assert_eq!(error_counter(&activity), 0.0);

    handle.push_result(Err(SqlPulseError::QueryExecution("relation does not exist".into())));
    assert_eq!(pg.run_once().await, Err(SqlPulseError::CycleExhausted));

    assert_eq!(gauge_values(&activity), vec![7.0]);
    assert_eq!(error_counter(&activity), 1.0);
    assert!(activity.log().last_is_error());
}

#[tokio::test]
async fn successful_run_replaces_only_its_connection_entry() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let first_handle = FakeHandle::returning(vec![row(&[("count", SqlValue::Int(1))])]);
    let second_handle = FakeHandle::returning(vec![row(&[("count", SqlValue::Int(2))])]);
    let first = connected("postgres://db1/postgres", first_handle.clone()).await;
    let second = {
        let connection = Connection::parse(1, "postgres://db2/postgres").expect("valid url");
        let connector = FakeConnector::new(second_handle.clone());
        let job = job("pg", &["postgres://db2/postgres"], Vec::new());
        connection.connect(connector.as_ref(), &job, &NullSink).await.expect("connect");
        connection
    };
    let activity = standalone(query("activity", &[], &["count"]), &catalog);

    activity.run(&first).await.expect("first connection");
    activity.run(&second).await.expect("second connection");

    first_handle.set_rows(vec![
        row(&[("count", SqlValue::Int(10))]),
        row(&[("count", SqlValue::Int(11))]),
    ]);
    activity.run(&first).await.expect("first connection again");

    let mut values: Vec<f64> =
        activity.cached_observations().iter().map(|observation| observation.value).collect();
    values.sort_by(f64::total_cmp);
    assert_eq!(values, vec![2.0, 10.0, 11.0]);
}

#[tokio::test]
async fn empty_result_clears_the_connection_entry() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let handle = FakeHandle::returning(vec![row(&[("count", SqlValue::Int(1))])]);
    let connection = connected("postgres://db1/postgres", handle.clone()).await;
    let activity = standalone(query("activity", &[], &["count"]), &catalog);

    activity.run(&connection).await.expect("first run");
    handle.set_rows(Vec::new());
    assert_eq!(activity.run(&connection).await, Ok(0));
    assert!(activity.cached_observations().is_empty());
}

/// Validates per-row failures are skipped, not fatal.
///
/// Assertions:
/// - a non-numeric value, a NULL value and a missing value column each log
///   one warning
/// - a row missing a label column is skipped entirely
/// - the remaining samples are stored
#[tokio::test]
async fn bad_rows_are_logged_and_skipped() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let handle = FakeHandle::returning(vec![
        row(&[("datname", SqlValue::Text("a".into())), ("count", SqlValue::Text("n/a".into()))]),
        row(&[("datname", SqlValue::Text("b".into())), ("count", SqlValue::Null)]),
        row(&[("datname", SqlValue::Text("c".into()))]),
        row(&[("count", SqlValue::Int(9))]),
        row(&[("datname", SqlValue::Null), ("count", SqlValue::Text("4".into()))]),
    ]);
    let connection = connected("postgres://db1/postgres", handle).await;
    let activity = standalone(query("activity", &["datname"], &["count"]), &catalog);

    assert_eq!(activity.run(&connection).await, Ok(1));

    let observations = activity.cached_observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].label_values[0], "");
    assert_eq!(observations[0].value, 4.0);

    assert_eq!(activity.log().error_count(), 4);
    let history = activity.log().history();
    assert!(history_contains(&history, "value column is not numeric"));
    assert!(history_contains(&history, "value column not found"));
    assert!(history_contains(&history, "label column not found"));
}

/// Validates columns the driver could not decode are skipped like bad values.
///
/// Assertions:
/// - an undecodable column nobody references is ignored
/// - an undecodable value column logs one warning, the good value is kept
/// - an undecodable label column skips its row
#[tokio::test]
async fn unsupported_columns_are_logged_and_skipped() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let handle = FakeHandle::returning(vec![
        row(&[
            ("datname", SqlValue::Text("a".into())),
            ("count", SqlValue::Int(5)),
            ("checksum", SqlValue::Unsupported("NUMERIC".into())),
            ("session_id", SqlValue::Unsupported("UUID".into())),
        ]),
        row(&[("datname", SqlValue::Unsupported("INET".into())), ("count", SqlValue::Int(6))]),
    ]);
    let connection = connected("postgres://db1/postgres", handle).await;
    let activity = standalone(query("activity", &["datname"], &["count", "checksum"]), &catalog);

    assert_eq!(activity.run(&connection).await, Ok(1));

    let observations = activity.cached_observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].label_values.first().map(String::as_str), Some("a"));
    assert_eq!(observations[0].label_values.last().map(String::as_str), Some("count"));
    assert_eq!(observations[0].value, 5.0);

    assert_eq!(activity.log().error_count(), 2);
    let history = activity.log().history();
    assert!(history_contains(&history, "unsupported column type NUMERIC"));
    assert!(history_contains(&history, "unsupported column type INET"));
    assert!(!history_contains(&history, "UUID"));
    assert_eq!(gauge_values(&activity), vec![5.0]);
}

#[tokio::test]
async fn duration_is_recorded_on_success_and_failure() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let handle = FakeHandle::returning(vec![row(&[("count", SqlValue::Int(1))])]);
    handle.push_result(Err(SqlPulseError::QueryExecution("timeout".into())));
    let connection = connected("postgres://db1/postgres", handle).await;
    let activity = standalone(query("activity", &[], &["count"]), &catalog);

    assert!(activity.run(&connection).await.is_err());
    assert!(activity.run(&connection).await.is_ok());

    let durations = activity.durations().expect("summary registered");
    assert_eq!(durations.sample_count(), 2);

    let gathered = catalog.registry().gather();
    let summary = family(&gathered, "sql_query_durations").expect("summary exported");
    assert_eq!(summary.get_metric()[0].get_summary().get_sample_count(), 2);
}

#[tokio::test]
async fn run_requires_a_connected_handle() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let connection = Connection::parse(0, "postgres://db1/postgres").expect("valid url");
    let activity = standalone(query("activity", &[], &["count"]), &catalog);

    let result = activity.run(&connection).await;
    assert_eq!(
        result,
        Err(SqlPulseError::QueryExecution("db connection not initialized".to_string()))
    );
}

/// Validates a dangling query reference disables the query.
///
/// Assertions:
/// - the query resolves to empty text and logs a warning
/// - it has no descriptor, registers nothing and collects nothing
/// - running it fails without touching the database
#[tokio::test]
async fn missing_query_ref_disables_the_query() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let config = QueryConfig {
        name: "dangling".into(),
        values: vec!["v".into()],
        query_ref: "q1".into(),
        ..Default::default()
    };
    let parent = Arc::new(RotatingLog::new(10, Arc::new(NullSink)));
    let dangling =
        Query::new("pg", config, &BTreeMap::new(), &catalog, parent.clone() as SharedSink, 10);

    assert!(!dangling.is_enabled());
    assert_eq!(dangling.sql(), "");
    assert!(dangling.collect().is_empty());
    assert!(catalog.registry().gather().is_empty());
    assert_eq!(parent.error_count(), 1);
    assert!(history_contains(&dangling.log().history(), "Skipping empty query"));

    let handle = FakeHandle::returning(Vec::new());
    let connection = connected("postgres://db1/postgres", handle.clone()).await;
    assert!(dangling.run(&connection).await.is_err());
    assert_eq!(handle.fetches(), 0);
}

#[tokio::test]
async fn query_ref_resolves_from_named_queries() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let mut named = BTreeMap::new();
    named.insert("q1".to_string(), "SELECT 1 AS v".to_string());
    let config = QueryConfig {
        name: "referenced".into(),
        help: "Referenced".into(),
        values: vec!["v".into()],
        query_ref: "q1".into(),
        ..Default::default()
    };

    let referenced = Query::new("pg", config, &named, &catalog, Arc::new(NullSink), 10);
    assert!(referenced.is_enabled());
    assert_eq!(referenced.sql(), "SELECT 1 AS v");
}

/// Validates registration conflicts disable only the conflicting query.
///
/// Two queries with the same name in the same job produce the same metric
/// identities; the second is refused.
#[tokio::test]
async fn duplicate_query_disables_second_query() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let first = standalone(query("activity", &[], &["count"]), &catalog);
    let second = standalone(query("activity", &[], &["count"]), &catalog);

    assert!(first.is_enabled());
    assert!(!second.is_enabled());
    assert!(second.descriptors().is_none());
    assert!(history_contains(&second.log().history(), "Failed to register metric"));
}

/// Validates a query whose metric clashes with another query's is disabled.
///
/// Assertions:
/// - the same metric name with other label names is refused
/// - names that collide with the shared error and duration metrics are refused
/// - refused queries register no duration summary
#[tokio::test]
async fn clashing_metric_identity_disables_query() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let first = Query::new(
        "a",
        query("up", &["datname"], &["count"]),
        &BTreeMap::new(),
        &catalog,
        Arc::new(NullSink),
        10,
    );
    assert!(first.is_enabled());

    for (name, labels) in [("up", &["state"][..]), ("query_errors", &[][..]), ("query_durations", &[][..])] {
        let clashing =
            Query::new("b", query(name, labels, &["count"]), &BTreeMap::new(), &catalog, Arc::new(NullSink), 10);
        assert!(!clashing.is_enabled(), "{name}");
        assert!(clashing.durations().is_none(), "{name}");
        assert!(history_contains(&clashing.log().history(), "Failed to register metric"), "{name}");
    }

    let gathered = catalog.registry().gather();
    let summary = family(&gathered, "sql_query_durations").expect("first summary");
    assert_eq!(summary.get_metric().len(), 1);
}

#[tokio::test]
async fn invalid_label_name_disables_query() {
    let catalog = DescriptorCatalog::new(Registry::new());
    let broken = standalone(query("activity", &["user"], &["count"]), &catalog);

    assert!(!broken.is_enabled());
    assert!(history_contains(&broken.log().history(), "Failed to create descriptor"));
    assert!(catalog.registry().gather().is_empty());
}
