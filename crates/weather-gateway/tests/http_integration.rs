use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use weather_cache::{Cache, CacheConfig};
use weather_circuitbreaker::{BreakerConfig, CircuitBreaker};
use weather_core::SystemClock;
use weather_gateway::http::{router, AppState};
use weather_gateway::orchestrator::Orchestrator;
use weather_gateway::rate_limit::RateLimiter;
use weather_metrics::MetricsRegistry;
use weather_retry::{RetryConfig, RetryExecutor};
use weather_upstream::{UpstreamClient, UpstreamConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Boots the gateway against a real TCP listener, backed by a wiremock
/// upstream, and returns the base URL clients should call.
async fn spawn_gateway(upstream: &MockServer, rate_limit_per_minute: u32) -> String {
    let clock = Arc::new(SystemClock::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let cache = Arc::new(Cache::new(Arc::clone(&clock), CacheConfig::default()));
    let breaker = Arc::new(CircuitBreaker::new(
        Arc::clone(&clock),
        Arc::clone(&metrics),
        BreakerConfig::default(),
    ));
    let retry = Arc::new(RetryExecutor::new(
        Arc::clone(&clock),
        Arc::clone(&metrics),
        RetryConfig::default(),
    ));
    let upstream_client = Arc::new(
        UpstreamClient::new(UpstreamConfig::new(upstream.uri(), "test-key")).unwrap(),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        clock,
        Arc::clone(&metrics),
        cache,
        breaker,
        retry,
        upstream_client,
    ));
    let state = Arc::new(AppState {
        orchestrator,
        metrics,
        rate_limiter: Arc::new(RateLimiter::new(rate_limit_per_minute)),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn weather_endpoint_returns_upstream_payload_and_metadata() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .and(query_param("query", "paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature": 18}
        })))
        .mount(&upstream)
        .await;

    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/weather?city=paris"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["current"]["temperature"], 18);
    assert_eq!(body["metadata"]["source"], "api");
    assert_eq!(body["metadata"]["cached"], false);
}

#[tokio::test]
async fn weather_endpoint_rejects_missing_city() {
    let upstream = MockServer::start().await;
    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/weather")).send().await;
    // Axum rejects a missing required Query field before our handler runs.
    assert!(resp.unwrap().status().is_client_error());
}

#[tokio::test]
async fn weather_endpoint_maps_not_found_to_404() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {"code": 404, "info": "City not found"}
        })))
        .mount(&upstream)
        .await;

    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/weather?city=nowhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error_type"], "not_found");
}

#[tokio::test]
async fn second_request_for_same_city_is_served_from_cache() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature": 9}
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();

    let first: serde_json::Value = client
        .get(format!("{base}/weather?city=oslo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["metadata"]["source"], "api");

    let second: serde_json::Value = client
        .get(format!("{base}/weather?city=oslo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["metadata"]["source"], "cache");
    assert_eq!(second["metadata"]["cached"], true);

    // wiremock's `expect(1)` is verified on drop; an extra upstream call
    // from a cache miss on the second request would fail the test.
}

#[tokio::test]
async fn health_endpoint_reports_healthy_status() {
    let upstream = MockServer::start().await;
    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "weather-gateway");
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn metrics_endpoint_reflects_recorded_requests() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature": 3}
        })))
        .mount(&upstream)
        .await;

    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();
    client
        .get(format!("{base}/weather?city=tokyo"))
        .send()
        .await
        .unwrap();

    let metrics: serde_json::Value = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["requests"], 1);
    assert_eq!(metrics["cache_misses"], 1);
}

#[tokio::test]
async fn root_endpoint_reports_service_info() {
    let upstream = MockServer::start().await;
    let base = spawn_gateway(&upstream, 60).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("{base}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["health"], "/health");
}

#[tokio::test]
async fn requests_beyond_the_per_minute_budget_are_throttled() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature": 0}
        })))
        .mount(&upstream)
        .await;

    let base = spawn_gateway(&upstream, 2).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .get(format!("{base}/weather?city=helsinki"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let throttled = client
        .get(format!("{base}/weather?city=helsinki"))
        .send()
        .await
        .unwrap();
    assert_eq!(throttled.status(), 429);

    // Give the TCP listener's background task a moment before the test
    // process tears the runtime down.
    tokio::time::sleep(Duration::from_millis(10)).await;
}
