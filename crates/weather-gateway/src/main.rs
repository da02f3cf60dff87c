use std::net::SocketAddr;
use std::sync::Arc;

use weather_cache::{Cache, CacheConfig};
use weather_circuitbreaker::{BreakerConfig, CircuitBreaker};
use weather_core::SystemClock;
use weather_gateway::config::GatewayConfig;
use weather_gateway::http::{router, AppState};
use weather_gateway::orchestrator::Orchestrator;
use weather_gateway::rate_limit::RateLimiter;
use weather_metrics::MetricsRegistry;
use weather_retry::RetryConfig;
use weather_upstream::{UpstreamClient, UpstreamConfig};

#[tokio::main]
async fn main() {
    let config = GatewayConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    tracing::info!("starting weather gateway");
    tracing::info!(rate_limit_per_minute = config.rate_limit_per_minute, "rate limit configured");
    tracing::info!(ttl = config.cache_ttl_seconds, stale_max_age = config.stale_cache_max_age_seconds, "cache configured");
    tracing::info!(
        failure_threshold = config.circuit_breaker_failure_threshold,
        recovery_timeout = config.circuit_breaker_recovery_timeout_seconds,
        "circuit breaker configured"
    );

    let clock = Arc::new(SystemClock::new());
    let metrics = Arc::new(MetricsRegistry::new());

    let cache = Arc::new(Cache::new(
        Arc::clone(&clock),
        CacheConfig {
            ttl: std::time::Duration::from_secs(config.cache_ttl_seconds),
            stale_max_age: std::time::Duration::from_secs(config.stale_cache_max_age_seconds),
            max_entries: config.max_cache_entries,
        },
    ));

    let breaker = Arc::new(CircuitBreaker::new(
        Arc::clone(&clock),
        Arc::clone(&metrics),
        BreakerConfig {
            failure_threshold: config.circuit_breaker_failure_threshold,
            recovery_timeout_seconds: config.circuit_breaker_recovery_timeout_seconds,
            rate_threshold: config.circuit_breaker_failure_rate_threshold,
        },
    ));

    let retry = Arc::new(weather_retry::RetryExecutor::new(
        Arc::clone(&clock),
        Arc::clone(&metrics),
        RetryConfig {
            max_attempts: config.retry_max_attempts,
            base_backoff: std::time::Duration::from_secs_f64(config.retry_backoff_base_seconds),
        },
    ));

    let mut upstream_config = UpstreamConfig::new(
        config.weatherstack_base_url.clone(),
        config.weatherstack_api_key.clone(),
    );
    upstream_config.connect_timeout = config.http_connect_timeout;
    upstream_config.read_timeout = config.http_read_timeout;
    upstream_config.total_timeout = config.http_total_timeout;
    let upstream = Arc::new(UpstreamClient::new(upstream_config).expect("failed to build upstream client"));

    let orchestrator = Arc::new(Orchestrator::new(
        clock,
        Arc::clone(&metrics),
        cache,
        breaker,
        retry,
        upstream,
    ));

    let state = Arc::new(AppState {
        orchestrator,
        metrics,
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_per_minute)),
    });

    let app = router(state).layer(
        tower::ServiceBuilder::new()
            .layer(tower_http::catch_panic::CatchPanicLayer::new())
            .layer(tower_http::trace::TraceLayer::new_for_http()),
    );

    let addr = SocketAddr::new(
        config.bind_host.parse().expect("invalid BIND_HOST"),
        config.bind_port,
    );
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");
    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    tracing::info!("shutdown signal received");
}
