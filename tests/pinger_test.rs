//! 探测执行器与扇出调度器集成测试

use api_vitals::pinger::{
    FanOutScheduler, HttpProbeExecutor, ProbeExecutor, StoreRecorder, SENTINEL_LATENCY_MS,
    SENTINEL_STATUS_CODE,
};
use api_vitals::store::{NewTarget, RegistryStore, SortOrder, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(timeout_ms: u64) -> HttpProbeExecutor {
    HttpProbeExecutor::with_timeout(Duration::from_millis(timeout_ms), None).unwrap()
}

async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap())
}

fn scheduler(store: Arc<SqliteStore>, timeout_ms: u64) -> FanOutScheduler {
    let registry: Arc<dyn RegistryStore> = store;
    FanOutScheduler::new(
        Arc::new(executor(timeout_ms)),
        Arc::new(StoreRecorder::new(registry)),
    )
}

#[tokio::test]
async fn test_http_error_statuses_are_recorded_as_is() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body("fine")
        .create_async()
        .await;
    let missing = server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;
    let broken = server
        .mock("GET", "/broken")
        .with_status(500)
        .create_async()
        .await;

    let executor = executor(2_000);

    let outcome = executor.probe(&format!("{}/ok", server.url())).await;
    assert_eq!(outcome.status_code, 200);
    assert!(outcome.latency_ms < SENTINEL_LATENCY_MS);
    assert!(outcome.is_healthy());

    let outcome = executor.probe(&format!("{}/missing", server.url())).await;
    assert_eq!(outcome.status_code, 404);
    assert!(!outcome.is_transport_failure());
    assert!(!outcome.is_healthy());

    let outcome = executor.probe(&format!("{}/broken", server.url())).await;
    assert_eq!(outcome.status_code, 500);
    assert!(!outcome.is_transport_failure());

    ok.assert_async().await;
    missing.assert_async().await;
    broken.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_host_yields_sentinel() {
    // 先绑定再释放，得到一个当前无人监听的端口
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let outcome = executor(2_000)
        .probe(&format!("http://127.0.0.1:{}/", port))
        .await;
    assert_eq!(outcome.status_code, SENTINEL_STATUS_CODE);
    assert_eq!(outcome.latency_ms, SENTINEL_LATENCY_MS);
}

#[tokio::test]
async fn test_slow_endpoint_past_timeout_yields_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let outcome = executor(300).probe(&format!("{}/slow", server.uri())).await;

    assert!(outcome.is_transport_failure());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_cycle_records_one_sample_per_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let store = memory_store().await;
    let mut ids = Vec::new();
    for i in 0..4 {
        let target = store
            .insert_target(NewTarget {
                name: format!("target-{}", i),
                url: format!("{}/t/{}", server.uri(), i),
                description: None,
            })
            .await
            .unwrap();
        ids.push(target.id);
    }

    let summary = scheduler(store.clone(), 2_000)
        .run_from_store(store.as_ref())
        .await;
    assert_eq!(summary.targets, 4);
    assert_eq!(summary.recorded, 4);
    assert_eq!(summary.transport_failures, 0);
    assert_eq!(summary.persist_failures, 0);

    for id in &ids {
        let samples = store.list_samples(id, SortOrder::Ascending).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].status_code, 204);
    }
}

#[tokio::test]
async fn test_slow_target_does_not_inflate_fast_latency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let store = memory_store().await;
    let fast = store
        .insert_target(NewTarget {
            name: "fast".to_string(),
            url: format!("{}/fast", server.uri()),
            description: None,
        })
        .await
        .unwrap();
    let hang = store
        .insert_target(NewTarget {
            name: "hang".to_string(),
            url: format!("{}/hang", server.uri()),
            description: None,
        })
        .await
        .unwrap();

    let summary = scheduler(store.clone(), 1_000)
        .run_from_store(store.as_ref())
        .await;
    assert_eq!(summary.recorded, 2);
    assert_eq!(summary.transport_failures, 1);

    let fast_samples = store
        .list_samples(&fast.id, SortOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(fast_samples[0].status_code, 200);
    assert!(fast_samples[0].latency_ms < 900);

    let hang_samples = store
        .list_samples(&hang.id, SortOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(hang_samples[0].status_code, SENTINEL_STATUS_CODE);
    assert_eq!(hang_samples[0].latency_ms, SENTINEL_LATENCY_MS);
}
