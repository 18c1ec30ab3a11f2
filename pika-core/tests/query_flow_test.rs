//! Read-path flow through the real HTTP storage client against a mock
//! engine, from metric type to reassembled series.

use std::sync::Arc;

use pika_core::config::StorageSettings;
use pika_core::models::MonitorStatus;
use pika_core::services::MetricQueryService;
use pika_core::storage::VictoriaMetricsStore;
use pika_protocol::MetricType;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> MetricQueryService {
    let store = VictoriaMetricsStore::new(&StorageSettings {
        endpoint: server.uri(),
        timeout_secs: 5,
    })
    .unwrap();
    MetricQueryService::new(Arc::new(store))
}

#[tokio::test]
async fn test_cpu_metrics_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .and(query_param("query", r#"pika_cpu_usage_percent{agent_id="a-1"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [{
                        "metric": {"__name__": "pika_cpu_usage_percent", "agent_id": "a-1"},
                        "values": [[1700000000, "12.5"], [1700000015, "13.0"]]
                    }]
                }
            }"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    let service = service_for(&server);

    let response = service
        .get_metrics("a-1", MetricType::Cpu, 1_700_000_000_000, 1_700_003_600_000, None)
        .await
        .unwrap();

    assert_eq!(response.agent_id, "a-1");
    assert_eq!(response.metric_type, "cpu");
    assert_eq!(response.series.len(), 1);
    assert_eq!(response.series[0].name, "usage");
    assert_eq!(response.series[0].data.len(), 2);
    assert_eq!(response.series[0].data[1].value, 13.0);
    assert!(!response.series[0].labels.contains_key("__name__"));
}

#[tokio::test]
async fn test_network_metrics_survive_one_failing_sub_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .and(query_param(
            "query",
            r#"sum(pika_network_sent_bytes_rate{agent_id="a-1"}) by (agent_id)"#,
        ))
        .respond_with(ResponseTemplate::new(500).set_body_string("engine busy"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .and(query_param(
            "query",
            r#"sum(pika_network_recv_bytes_rate{agent_id="a-1"}) by (agent_id)"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [{
                        "metric": {"agent_id": "a-1"},
                        "values": [[1700000000, "2048"]]
                    }]
                }
            }"#,
        ))
        .mount(&server)
        .await;
    let service = service_for(&server);

    let response = service
        .get_metrics("a-1", MetricType::Network, 0, 3_600_000, None)
        .await
        .unwrap();

    assert_eq!(response.series.len(), 1);
    assert_eq!(response.series[0].name, "download");
}

#[tokio::test]
async fn test_monitor_stats_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", r#"pika_monitor_response_time_ms{monitor_id="m-1"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "status": "success",
                "data": {
                    "resultType": "vector",
                    "result": [{
                        "metric": {"agent_id": "a-1", "monitor_id": "m-1"},
                        "value": [1700000100, "150"]
                    }]
                }
            }"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", r#"pika_monitor_status{monitor_id="m-1"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "status": "success",
                "data": {
                    "resultType": "vector",
                    "result": [{
                        "metric": {"agent_id": "a-1", "monitor_id": "m-1", "status": "up"},
                        "value": [1700000100, "1"]
                    }]
                }
            }"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", r#"pika_monitor_cert_days_left{monitor_id="m-1"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": "success", "data": {"resultType": "vector", "result": []}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param(
            "query",
            r#"pika_monitor_cert_expiry_timestamp_ms{monitor_id="m-1"}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": "success", "data": {"resultType": "vector", "result": []}}"#,
        ))
        .mount(&server)
        .await;
    let service = service_for(&server);

    let stats = service.monitor_stats("m-1").await.unwrap();

    assert_eq!(stats.agent_count, 1);
    assert_eq!(stats.status, MonitorStatus::Up);
    assert_eq!(stats.response_time, 150);
    assert_eq!(stats.last_check_time, 1_700_000_100_000);
    assert!(stats.cert_expiry_date.is_none());
}
