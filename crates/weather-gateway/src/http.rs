//! Axum routes and handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use weather_core::SystemClock;
use weather_upstream::UpstreamClient;

use crate::error::HttpError;
use crate::orchestrator::Orchestrator;
use crate::rate_limit::RateLimiter;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator<SystemClock, UpstreamClient>>,
    pub metrics: Arc<weather_metrics::MetricsRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/", get(root))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check(addr.ip()) {
        next.run(request).await
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}

#[derive(Deserialize)]
struct WeatherQuery {
    city: String,
}

async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let response = state.orchestrator.handle(&query.city).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    service: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthBody {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: "weather-gateway",
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

#[derive(Serialize)]
struct RootBody {
    message: &'static str,
    version: &'static str,
    health: &'static str,
}

async fn root() -> impl IntoResponse {
    Json(RootBody {
        message: "Weather Gateway",
        version: env!("CARGO_PKG_VERSION"),
        health: "/health",
    })
}
