//! Request orchestrator: composes cache, breaker, and retry per request.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use weather_cache::{Cache, CacheKey};
use weather_circuitbreaker::{BreakerOpen, CircuitBreaker, CircuitState};
use weather_core::{Clock, ErrorKind, GatewayError};
use weather_metrics::MetricsRegistry;
use weather_retry::RetryExecutor;

/// Anything capable of fetching a city's current weather. Implemented by
/// [`weather_upstream::UpstreamClient`]; abstracted here so the
/// orchestrator's decision tree can be exercised without a live HTTP call.
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<Value, GatewayError>;
}

#[async_trait::async_trait]
impl WeatherSource for weather_upstream::UpstreamClient {
    async fn fetch(&self, city: &str) -> Result<Value, GatewayError> {
        weather_upstream::UpstreamClient::fetch(self, city).await
    }
}

fn breaker_state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub cached: bool,
    pub stale: bool,
    pub age_seconds: f64,
    pub source: &'static str,
    pub retry_attempts: u32,
    pub circuit_breaker_state: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherResponse {
    pub data: Value,
    pub metadata: ResponseMetadata,
}

/// Composes [`Cache`], [`CircuitBreaker`], and [`RetryExecutor`] into the
/// per-request decision tree.
pub struct Orchestrator<C: Clock, S: WeatherSource> {
    clock: Arc<C>,
    metrics: Arc<MetricsRegistry>,
    cache: Arc<Cache<C>>,
    breaker: Arc<CircuitBreaker<C>>,
    retry: Arc<RetryExecutor<C>>,
    source: Arc<S>,
}

impl<C: Clock, S: WeatherSource> Orchestrator<C, S> {
    pub fn new(
        clock: Arc<C>,
        metrics: Arc<MetricsRegistry>,
        cache: Arc<Cache<C>>,
        breaker: Arc<CircuitBreaker<C>>,
        retry: Arc<RetryExecutor<C>>,
        source: Arc<S>,
    ) -> Self {
        Self {
            clock,
            metrics,
            cache,
            breaker,
            retry,
            source,
        }
    }

    /// Resolves a weather request for `raw_city` per the decision tree:
    /// fresh cache hit, breaker short-circuit with stale fallback, upstream
    /// fetch with retry, and degraded stale-fallback on infra failure.
    pub async fn handle(&self, raw_city: &str) -> Result<WeatherResponse, GatewayError> {
        let city = raw_city.trim();
        if city.is_empty() {
            return Err(GatewayError::BadRequest("city parameter is required".into()));
        }

        self.metrics.record_request();
        let start = self.clock.now();
        let key = CacheKey::new(city);

        if let Some(payload) = self.cache.get_fresh(&key) {
            self.metrics.record_cache_hit();
            self.finish(start);
            return Ok(WeatherResponse {
                data: payload,
                metadata: ResponseMetadata {
                    cached: true,
                    stale: false,
                    age_seconds: 0.0,
                    source: "cache",
                    retry_attempts: 0,
                    circuit_breaker_state: breaker_state_label(self.breaker.state()),
                },
            });
        }
        self.metrics.record_cache_miss();

        if self.breaker.admit().is_err() {
            return self.handle_breaker_open(&key, start);
        }

        let source = Arc::clone(&self.source);
        let city_owned = city.to_string();
        let attempt_result = self
            .retry
            .execute(|_attempt| {
                let source = Arc::clone(&source);
                let city = city_owned.clone();
                async move { source.fetch(&city).await }
            })
            .await;

        match attempt_result {
            Ok(outcome) => {
                self.breaker.record_success();
                self.cache.put(key, outcome.value.clone());
                self.finish(start);
                Ok(WeatherResponse {
                    data: outcome.value,
                    metadata: ResponseMetadata {
                        cached: false,
                        stale: false,
                        age_seconds: 0.0,
                        source: "api",
                        retry_attempts: outcome.retry_attempts,
                        circuit_breaker_state: breaker_state_label(self.breaker.state()),
                    },
                })
            }
            Err(err) => {
                self.breaker.record(err.breaker_verdict());
                self.metrics.record_error(err.kind());
                if matches!(err.kind(), ErrorKind::Timeout) {
                    self.metrics.record_timeout();
                }
                self.handle_fetch_error(&key, err, start)
            }
        }
    }

    fn handle_breaker_open(
        &self,
        key: &CacheKey,
        start: f64,
    ) -> Result<WeatherResponse, GatewayError> {
        self.metrics.record_error(ErrorKind::BreakerOpen);
        if let Some((payload, cache_meta)) = self.cache.get_any(key) {
            self.metrics.record_stale_fallback();
            self.finish(start);
            return Ok(WeatherResponse {
                data: payload,
                metadata: ResponseMetadata {
                    cached: cache_meta.cached,
                    stale: cache_meta.stale,
                    age_seconds: cache_meta.age_seconds,
                    source: "cache_fallback",
                    retry_attempts: 0,
                    circuit_breaker_state: breaker_state_label(CircuitState::Open),
                },
            });
        }
        self.finish(start);
        Err(GatewayError::BreakerOpen)
    }

    fn handle_fetch_error(
        &self,
        key: &CacheKey,
        err: GatewayError,
        start: f64,
    ) -> Result<WeatherResponse, GatewayError> {
        let kind = err.kind();

        // NotFound/Auth indicate the answer, not an outage: surface
        // immediately rather than masking them with stale data.
        if !err.stale_eligible() {
            self.finish(start);
            return Err(err);
        }

        if let Some((payload, cache_meta)) = self.cache.get_any(key) {
            self.metrics.record_stale_fallback();
            self.finish(start);
            return Ok(WeatherResponse {
                data: payload,
                metadata: ResponseMetadata {
                    cached: cache_meta.cached,
                    stale: cache_meta.stale,
                    age_seconds: cache_meta.age_seconds,
                    source: "cache_fallback",
                    retry_attempts: 0,
                    circuit_breaker_state: breaker_state_label(self.breaker.state()),
                },
            });
        }

        tracing::debug!(%kind, "orchestrator: no stale fallback available");
        self.finish(start);
        Err(err)
    }

    fn finish(&self, start: f64) {
        let elapsed = self.clock.now() - start;
        self.metrics.record_response_time(elapsed);
    }
}
