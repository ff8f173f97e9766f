//! Poll cycle tests against a fake overseer status endpoint.

use async_trait::async_trait;
use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use overseer_client::StatusClient;
use overseer_core::{
    Config, MetricSample, SinkError, LEADER, OVERSEER_COLLECTION_QUEUE_SIZE, OVERSEER_QUEUE_SIZE,
    OVERSEER_WORK_QUEUE_SIZE,
};
use overseer_metrics::{MemorySink, MetricExtractor, PollCollector, Sink};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn collections(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    match params.get("action").map(String::as_str) {
        Some("OVERSEERSTATUS") => Json(json!({
            "leader": ["host-a", "host-b"],
            "overseer_queue_size": 1,
            "overseer_work_queue_size": 2,
            "overseer_collection_queue_size": 3
        }))
        .into_response(),
        Some("PARTIAL") => Json(json!({
            "leader": ["host-b"],
            "overseer_work_queue_size": 2,
            "overseer_collection_queue_size": 3
        }))
        .into_response(),
        Some("HANG") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_fake_solr() -> SocketAddr {
    let app = Router::new().route("/solr/admin/collections", get(collections));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr, status: &str) -> Arc<Config> {
    Arc::new(Config {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        status: status.to_string(),
        identity: Some("host-a".to_string()),
        ..Config::default()
    })
}

/// Rejects every other sample
#[derive(Default)]
struct FlakySink {
    calls: AtomicUsize,
}

#[async_trait]
impl Sink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn dispatch(&self, plugin_instance: &str, sample: &MetricSample) -> Result<(), SinkError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(SinkError::Rejected {
                sink: "flaky".to_string(),
                sample: sample.name.clone(),
                reason: format!("backend refused {}", plugin_instance),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_full_cycle_dispatches_four_gauges() {
    let addr = spawn_fake_solr().await;
    let sink = Arc::new(MemorySink::new());
    let collector = PollCollector::new(config_for(addr, "OVERSEERSTATUS"), sink.clone()).unwrap();

    let report = collector.run_cycle().await;
    assert!(report.fetched);
    assert_eq!(report.dispatched, 4);
    assert_eq!(report.omitted, 0);

    let instances: Vec<_> = sink
        .records()
        .into_iter()
        .map(|r| r.plugin_instance)
        .collect();
    assert_eq!(
        instances,
        vec![
            LEADER,
            OVERSEER_QUEUE_SIZE,
            OVERSEER_WORK_QUEUE_SIZE,
            OVERSEER_COLLECTION_QUEUE_SIZE
        ]
    );
    assert_eq!(sink.last_value(LEADER), Some(1.0));
    assert_eq!(sink.last_value(OVERSEER_WORK_QUEUE_SIZE), Some(2.0));
    assert_eq!(sink.last_value(OVERSEER_COLLECTION_QUEUE_SIZE), Some(3.0));
}

#[tokio::test]
async fn test_missing_field_yields_partial_output() {
    let addr = spawn_fake_solr().await;
    let sink = Arc::new(MemorySink::new());
    let collector = PollCollector::new(config_for(addr, "PARTIAL"), sink.clone()).unwrap();

    let report = collector.run_cycle().await;
    assert!(report.fetched);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.omitted, 1);
    assert_eq!(sink.last_value(OVERSEER_QUEUE_SIZE), None);
    assert_eq!(sink.last_value(LEADER), Some(0.0));
}

#[tokio::test]
async fn test_timed_out_fetch_completes_cycle_without_samples() {
    let addr = spawn_fake_solr().await;
    let config = config_for(addr, "HANG");
    let client = StatusClient::new(&config)
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    let sink = Arc::new(MemorySink::new());
    let collector = PollCollector::from_parts(
        config,
        client,
        MetricExtractor::new(false),
        sink.clone(),
        "host-a",
    );

    let report = collector.run_cycle().await;
    assert!(!report.fetched);
    assert_eq!(report.dispatched, 0);
    assert!(report.elapsed < Duration::from_secs(2));
    assert!(sink.is_empty());
    assert_eq!(collector.summary().failed_fetches, 1);
}

#[tokio::test]
async fn test_sink_failures_are_counted_not_propagated() {
    let addr = spawn_fake_solr().await;
    let sink = Arc::new(FlakySink::default());
    let collector = PollCollector::new(config_for(addr, "OVERSEERSTATUS"), sink.clone()).unwrap();

    let report = collector.run_cycle().await;
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.sink_failures, 2);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 4);

    let second = collector.run_cycle().await;
    assert!(second.fetched);

    let summary = collector.summary();
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.samples_dispatched, 4);
    assert_eq!(summary.sink_failures, 4);
}
