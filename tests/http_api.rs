//! End-to-end behavior of the HTTP surface.

use std::sync::Arc;

use synthetic_workload::config::ConfigStore;
use synthetic_workload::http::ConfigStatus;
use synthetic_workload::workload::WorkloadResponse;

mod common;

#[tokio::test]
async fn test_fixed_cost_config_always_succeeds() {
    let store = common::store_with(0, 10, 11, 1024);
    let (addr, shutdown) = common::start_server(store.clone()).await;
    let client = common::client();

    for _ in 0..50 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), r#"{"message":"Hello world!","duration":10}"#);
    }
    assert_eq!(store.snapshot().buffer_len(), 1024);

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_duration_within_configured_range() {
    let (addr, shutdown) = common::start_server(common::store_with(0, 1_000, 1_050, 0)).await;
    let client = common::client();

    for _ in 0..50 {
        let body: WorkloadResponse = client
            .post(format!("http://{}/anything", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body.message, "Hello world!");
        assert!((1_000..1_050).contains(&body.duration), "duration {}", body.duration);
    }

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_full_error_rate_always_fails() {
    let (addr, shutdown) = common::start_server(common::store_with(100, 10, 20, 0)).await;
    let client = common::client();

    for _ in 0..50 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(res.status(), 500);
        assert!(res.text().await.unwrap().is_empty());
    }

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_unconfigured_service_answers_503() {
    let (addr, shutdown) = common::start_server(Arc::new(ConfigStore::new())).await;
    let client = common::client();

    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), 503);

    let status: ConfigStatus = client
        .get(format!("http://{}/config", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.configured);
    assert_eq!(status.generation, 0);
    assert!(status.config.is_none());

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_metrics_scrape() {
    let (addr, shutdown) = common::start_server(common::store_with(100, 10, 11, 0)).await;
    let client = common::client();

    client.get(format!("http://{}/", addr)).send().await.unwrap();

    let res = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let text = res.text().await.unwrap();
    assert!(text.contains("workload_request_duration_seconds"));
    assert!(text.contains(r#"code="500""#));
    assert!(text.contains("workload_simulated_failures_total"));

    shutdown.trigger("test");
}

#[tokio::test]
async fn test_request_id_round_trip() {
    let (addr, shutdown) = common::start_server(common::store_with(0, 10, 11, 0)).await;

    let res = common::client()
        .get(format!("http://{}/", addr))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    shutdown.trigger("test");
}
