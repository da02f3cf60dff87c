//! Weatherstack HTTP client.
//!
//! A single attempt issues one request and never retries internally —
//! retrying is the retry executor's job, one layer up. Wire format:
//! `GET {base}/current?access_key={key}&query={city}`.

use std::time::Duration;

use serde_json::Value;
use weather_core::GatewayError;

/// Timeouts and connection details for the upstream client. Defaults:
/// connect=3s, read=5s, total=8s.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub total_timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(5),
            total_timeout: Duration::from_secs(8),
        }
    }
}

/// A client for the upstream weather provider.
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Fetches current weather for `city`. A single attempt; never
    /// retries internally.
    pub async fn fetch(&self, city: &str) -> Result<Value, GatewayError> {
        let fut = self.fetch_inner(city);
        match tokio::time::timeout(self.config.total_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(city, "upstream: total deadline exceeded");
                Err(GatewayError::Timeout)
            }
        }
    }

    async fn fetch_inner(&self, city: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/current", self.config.base_url.trim_end_matches('/'));

        let response = tokio::time::timeout(
            self.config.read_timeout,
            self.http
                .get(&url)
                .query(&[("access_key", self.config.api_key.as_str()), ("query", city)])
                .send(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(city, "upstream: read deadline exceeded");
            GatewayError::Timeout
        })?
        .map_err(map_transport_error)?;

        let status = response.status();

        let text = tokio::time::timeout(self.config.read_timeout, response.text())
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(map_transport_error)?;

        let body: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(code) = body.as_ref().and_then(in_body_error_code) {
            return Err(error_for_code(code, body.as_ref().unwrap()));
        }

        if !status.is_success() {
            return Err(error_for_http_status(status));
        }

        body.ok_or_else(|| GatewayError::Malformed(format!("non-JSON response body: {text}")))
    }
}

fn in_body_error_code(body: &Value) -> Option<u64> {
    body.get("error")?.get("code")?.as_u64()
}

fn error_for_code(code: u64, body: &Value) -> GatewayError {
    let message = body
        .get("error")
        .and_then(|e| e.get("info"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();
    match code {
        401 => GatewayError::Auth,
        404 => GatewayError::NotFound,
        429 => GatewayError::RateLimited,
        _ => GatewayError::ServerError(message),
    }
}

fn error_for_http_status(status: reqwest::StatusCode) -> GatewayError {
    match status.as_u16() {
        401 => GatewayError::Auth,
        404 => GatewayError::NotFound,
        429 => GatewayError::RateLimited,
        code if (500..600).contains(&code) => {
            GatewayError::ServerError(format!("upstream returned {code}"))
        }
        code => GatewayError::ServerError(format!("unexpected status {code}")),
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}
