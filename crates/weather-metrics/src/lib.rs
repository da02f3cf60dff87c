//! In-process metrics registry.
//!
//! A single process-scoped [`MetricsRegistry`] is shared by the cache,
//! circuit breaker, retry executor, and request orchestrator. Every
//! mutating method is safe under concurrent invocation from many request
//! handlers; [`MetricsRegistry::snapshot`] returns a point-in-time view
//! that is consistent per counter but not across counters, matching the
//! ordering guarantees in spec §5.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use serde::Serialize;
use weather_core::ErrorKind;

/// Capacity of the response-time sample ring buffer.
const RESPONSE_TIME_CAPACITY: usize = 1000;

/// Process-scoped counters and histograms reflecting the decisions made by
/// the cache, breaker, and retry executor.
pub struct MetricsRegistry {
    requests: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    stale_fallbacks: AtomicU64,
    breaker_opens: AtomicU64,
    retry_attempts: AtomicU64,
    errors_by_kind: Mutex<HashMap<ErrorKind, u64>>,
    response_times: Mutex<VecDeque<f64>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            stale_fallbacks: AtomicU64::new(0),
            breaker_opens: AtomicU64::new(0),
            retry_attempts: AtomicU64::new(0),
            errors_by_kind: Mutex::new(HashMap::new()),
            response_times: Mutex::new(VecDeque::with_capacity(RESPONSE_TIME_CAPACITY)),
        }
    }

    /// Records one inbound request, regardless of outcome.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("metrics: request recorded");
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_requests_total").increment(1);
    }

    /// Records one failure of the given kind.
    pub fn record_error(&self, kind: ErrorKind) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        let mut by_kind = self.errors_by_kind.lock().unwrap();
        *by_kind.entry(kind).or_insert(0) += 1;
        tracing::debug!(%kind, "metrics: error recorded");
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_errors_total", "kind" => kind.to_string()).increment(1);
    }

    /// Records one upstream timeout (in addition to `record_error`, since a
    /// timeout is also an error kind).
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_timeouts_total").increment(1);
    }

    /// Records a fresh-cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_cache_hits_total").increment(1);
    }

    /// Records a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_cache_misses_total").increment(1);
    }

    /// Records a response served from the stale cache.
    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_stale_fallbacks_total").increment(1);
    }

    /// Records a circuit breaker Closed/HalfOpen → Open transition.
    pub fn record_breaker_open(&self) {
        self.breaker_opens.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("metrics: breaker_open recorded");
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_breaker_opens_total").increment(1);
    }

    /// Records one retry attempt (not the initial attempt).
    pub fn record_retry(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("weather_gateway_retry_attempts_total").increment(1);
    }

    /// Records one request's end-to-end response time, in seconds.
    ///
    /// The buffer holds the last 1000 samples; the oldest is dropped once
    /// full.
    pub fn record_response_time(&self, seconds: f64) {
        let mut buf = self.response_times.lock().unwrap();
        if buf.len() >= RESPONSE_TIME_CAPACITY {
            buf.pop_front();
        }
        buf.push_back(seconds);
        #[cfg(feature = "metrics")]
        histogram!("weather_gateway_response_time_seconds").record(seconds);
    }

    /// Takes a point-in-time snapshot of every counter and the response
    /// time sample buffer.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests,
            errors,
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            breaker_opens: self.breaker_opens.load(Ordering::Relaxed),
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
            errors_by_kind: self
                .errors_by_kind
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            cache_hit_rate: rate(cache_hits, cache_hits + cache_misses),
            error_rate: rate(errors, requests),
            response_time_samples: self.response_times.lock().unwrap().len(),
            p50: self.response_time_percentile(0.50),
            p95: self.response_time_percentile(0.95),
            p99: self.response_time_percentile(0.99),
        }
    }

    /// Returns the `p`-th percentile (0.0–1.0) of recorded response times,
    /// or 0.0 if no samples have been recorded.
    ///
    /// Sorts a copy of the buffer and returns the element at
    /// `floor(p * n)`, clamped to `[0, n - 1]`.
    pub fn response_time_percentile(&self, p: f64) -> f64 {
        let buf = self.response_times.lock().unwrap();
        if buf.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = buf.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();
        let idx = ((p * n as f64).floor() as usize).min(n - 1);
        sorted[idx]
    }
}

fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// A point-in-time view of every counter tracked by [`MetricsRegistry`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub stale_fallbacks: u64,
    pub breaker_opens: u64,
    pub retry_attempts: u64,
    pub errors_by_kind: HashMap<String, u64>,
    pub cache_hit_rate: f64,
    pub error_rate: f64,
    pub response_time_samples: usize,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}
