//! Load client behaviour against a mock cluster.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use calcite_perf_common::{ClusterConfig, Credentials, LogType};
use calcite_perf_loadtest::{
    run_load_test, LoadTestConfig, LogSelection, Query, QueryBody, QueryClient, QuerySet,
    QueryType, StatsCollector,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cluster(server: &MockServer, index: Option<&str>) -> ClusterConfig {
    ClusterConfig {
        endpoint: server.uri(),
        credentials: None,
        index: index.map(str::to_string),
    }
}

fn ppl_query(text: &str) -> Query {
    Query {
        name: format!("PPL Query: vpc/{text}"),
        log_type: LogType::Vpc,
        body: QueryBody::Ppl(text.to_string()),
    }
}

#[tokio::test]
async fn test_ppl_success_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_plugins/_ppl"))
        .and(body_json(json!({"query": "source = vpc | head 5"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"datarows\": []}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueryClient::new(&cluster(&server, None), Duration::from_secs(5)).unwrap();
    let outcome = client.execute(&ppl_query("source = vpc | head 5")).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.content_length, 16);
    assert_eq!(outcome.name, "PPL Query: vpc/source = vpc | head 5");
}

#[tokio::test]
async fn test_non_200_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_plugins/_ppl"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = QueryClient::new(&cluster(&server, None), Duration::from_secs(5)).unwrap();
    let outcome = client.execute(&ppl_query("x")).await;
    assert_eq!(outcome.error.as_deref(), Some("Got status code 201"));
}

#[tokio::test]
async fn test_transport_error_is_failure() {
    let server = MockServer::start().await;
    let config = cluster(&server, None);
    drop(server);

    let client = QueryClient::new(&config, Duration::from_secs(2)).unwrap();
    let outcome = client.execute(&ppl_query("x")).await;
    assert!(outcome
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Request failed")));
}

#[tokio::test]
async fn test_dsl_goes_to_index_search_with_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vpc_logs/_search"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .and(body_json(json!({"size": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = cluster(&server, Some("vpc_logs"));
    config.credentials = Some(Credentials {
        username: "admin".to_string(),
        password: "secret".to_string(),
    });
    let client = QueryClient::new(&config, Duration::from_secs(5)).unwrap();
    let query = Query {
        name: "DSL Query: vpc/count".to_string(),
        log_type: LogType::Vpc,
        body: QueryBody::Dsl(json!({"size": 0})),
    };
    assert!(client.execute(&query).await.is_success());
}

#[tokio::test]
async fn test_short_run_records_every_query_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_plugins/_ppl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vpc_logs/_search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("ppl/vpc")).unwrap();
    fs::create_dir_all(dir.path().join("dsl/vpc")).unwrap();
    fs::write(dir.path().join("ppl/vpc/head.ppl"), "source = vpc | head 1").unwrap();
    fs::write(dir.path().join("dsl/vpc/all.json"), r#"{"query": {"match_all": {}}}"#).unwrap();

    let queries =
        QuerySet::load(dir.path(), LogSelection::One(LogType::Vpc), QueryType::Both).unwrap();
    let stats = Arc::new(StatsCollector::new().unwrap());
    let config = LoadTestConfig {
        users: 3,
        spawn_rate: 100.0,
        run_time: Some(Duration::from_millis(500)),
        wait_min: Duration::from_millis(5),
        wait_max: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
        report_interval: Duration::ZERO,
    };

    run_load_test(
        &cluster(&server, Some("vpc_logs")),
        Arc::new(queries),
        &config,
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    let snapshot = stats.snapshot();
    assert!(snapshot.aggregated.request_count > 0);
    for row in &snapshot.rows {
        assert!(row.name == "PPL Query: vpc/head" || row.name == "DSL Query: vpc/all");
        if row.name.starts_with("PPL") {
            assert_eq!(row.failure_count, 0);
        } else {
            assert_eq!(row.failure_count, row.request_count);
        }
    }
    for failure in &snapshot.failures {
        assert_eq!(failure.name, "DSL Query: vpc/all");
        assert_eq!(failure.error, "Got status code 500");
    }
}
