//! Environment-variable configuration, loaded once at startup.
//!
//! A missing `WEATHERSTACK_API_KEY` or an unparsable numeric variable is a
//! misconfiguration the process cannot recover from; [`GatewayConfig::load`]
//! prints a diagnostic to stderr and exits with status 1 rather than
//! starting in a half-configured state.

use std::time::Duration;

pub struct GatewayConfig {
    pub weatherstack_api_key: String,
    pub weatherstack_base_url: String,

    pub cache_ttl_seconds: u64,
    pub stale_cache_max_age_seconds: u64,
    pub max_cache_entries: usize,

    pub rate_limit_per_minute: u32,

    pub retry_max_attempts: u32,
    pub retry_backoff_base_seconds: f64,

    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_recovery_timeout_seconds: f64,
    pub circuit_breaker_failure_rate_threshold: f64,

    pub http_connect_timeout: Duration,
    pub http_read_timeout: Duration,
    pub http_total_timeout: Duration,

    pub log_level: String,
    pub bind_host: String,
    pub bind_port: u16,
}

impl GatewayConfig {
    /// Loads configuration from the environment, exiting the process with
    /// a diagnostic on any missing required variable or invalid value.
    pub fn load() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(message) => {
                eprintln!("{}", "=".repeat(60));
                eprintln!("ERROR: Configuration validation failed!");
                eprintln!("{}", "=".repeat(60));
                eprintln!("\n{message}");
                eprintln!("\nTo fix this:");
                eprintln!("1. Set environment variable: export WEATHERSTACK_API_KEY=your_api_key");
                eprintln!("2. Or pass it to Docker: docker run -e WEATHERSTACK_API_KEY=your_api_key ...");
                eprintln!("\nGet your free API key at: https://weatherstack.com/signup/free");
                eprintln!("{}", "=".repeat(60));
                std::process::exit(1);
            }
        }
    }

    fn from_env() -> Result<Self, String> {
        let weatherstack_api_key = require_env("WEATHERSTACK_API_KEY")?;

        Ok(Self {
            weatherstack_api_key,
            weatherstack_base_url: env_or("WEATHERSTACK_BASE_URL", "http://api.weatherstack.com"),

            cache_ttl_seconds: parse_env("CACHE_TTL_SECONDS", 300)?,
            stale_cache_max_age_seconds: parse_env("STALE_CACHE_MAX_AGE_SECONDS", 3600)?,
            max_cache_entries: parse_env("MAX_CACHE_ENTRIES", 1000)?,

            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 60)?,

            retry_max_attempts: parse_env("RETRY_MAX_ATTEMPTS", 3)?,
            retry_backoff_base_seconds: parse_env("RETRY_BACKOFF_BASE", 1.0)?,

            circuit_breaker_failure_threshold: parse_env("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
            circuit_breaker_recovery_timeout_seconds: parse_env(
                "CIRCUIT_BREAKER_RECOVERY_TIMEOUT",
                60.0,
            )?,
            circuit_breaker_failure_rate_threshold: parse_env(
                "CIRCUIT_BREAKER_FAILURE_RATE_THRESHOLD",
                0.5,
            )?,

            http_connect_timeout: Duration::from_secs_f64(parse_env("HTTP_CONNECT_TIMEOUT", 3.0)?),
            http_read_timeout: Duration::from_secs_f64(parse_env("HTTP_READ_TIMEOUT", 5.0)?),
            http_total_timeout: Duration::from_secs_f64(parse_env("HTTP_TOTAL_TIMEOUT", 8.0)?),

            log_level: env_or("LOG_LEVEL", "info"),
            bind_host: env_or("BIND_HOST", "0.0.0.0"),
            bind_port: parse_env("BIND_PORT", 8080)?,
        })
    }
}

fn require_env(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| format!("Invalid value for {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        std::env::remove_var("WEATHER_GATEWAY_TEST_UNSET_VAR");
        let value: u64 = parse_env("WEATHER_GATEWAY_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_env_rejects_unparsable_values() {
        std::env::set_var("WEATHER_GATEWAY_TEST_BAD_NUMBER", "not-a-number");
        let result: Result<u64, String> = parse_env("WEATHER_GATEWAY_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
        std::env::remove_var("WEATHER_GATEWAY_TEST_BAD_NUMBER");
    }
}
