//! Error taxonomy shared by every layer of the resilience core.
//!
//! The teacher's upstream exception hierarchy attached HTTP status codes to
//! classes; here the mapping is a total function over a tagged enum, so the
//! policy table lives in exactly one place instead of being re-derived by
//! every call site.

use std::fmt;

/// The classification assigned to one upstream attempt, from the circuit
/// breaker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerVerdict {
    /// Counts toward `consecutive_failures` resetting and the recent-outcome
    /// ring buffer as a success.
    Success,
    /// Counts toward opening the circuit.
    Failure,
    /// Never reaches the breaker (e.g. a client-side bad request) — no
    /// effect on its state.
    None,
}

/// The full error taxonomy produced anywhere in the gateway.
///
/// Every variant has a canonical HTTP status, a retry eligibility, a
/// circuit-breaker verdict, and a stale-cache eligibility — see
/// [`GatewayError::http_status`], [`GatewayError::retryable`],
/// [`GatewayError::breaker_verdict`], and [`GatewayError::stale_eligible`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request itself was invalid (e.g. an empty `city`).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upstream rejected our credentials.
    #[error("upstream authentication failed")]
    Auth,

    /// Upstream has no data for the requested city.
    #[error("city not found")]
    NotFound,

    /// Upstream is rate limiting us.
    #[error("rate limited by upstream")]
    RateLimited,

    /// The connection to upstream could not be established or was reset.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// A connect, read, or total deadline was exceeded.
    #[error("upstream request timed out")]
    Timeout,

    /// Upstream responded with a 5xx (other than ones mapped above).
    #[error("upstream server error: {0}")]
    ServerError(String),

    /// The upstream payload failed to decode or was missing expected shape.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// The circuit breaker rejected the call without contacting upstream.
    #[error("circuit breaker is open")]
    BreakerOpen,
}

/// A lightweight discriminant for [`GatewayError`], useful as a metrics
/// label or match target without cloning the full error (and its message).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Auth,
    NotFound,
    RateLimited,
    Transport,
    Timeout,
    ServerError,
    Malformed,
    BreakerOpen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Malformed => "malformed",
            ErrorKind::BreakerOpen => "breaker_open",
        };
        f.write_str(s)
    }
}

impl GatewayError {
    /// The discriminant for this error, stripped of its message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::BadRequest(_) => ErrorKind::BadRequest,
            GatewayError::Auth => ErrorKind::Auth,
            GatewayError::NotFound => ErrorKind::NotFound,
            GatewayError::RateLimited => ErrorKind::RateLimited,
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Timeout => ErrorKind::Timeout,
            GatewayError::ServerError(_) => ErrorKind::ServerError,
            GatewayError::Malformed(_) => ErrorKind::Malformed,
            GatewayError::BreakerOpen => ErrorKind::BreakerOpen,
        }
    }

    /// The canonical HTTP status for this error kind (spec §7).
    pub fn http_status_code(&self) -> u16 {
        self.kind().http_status_code()
    }

    /// Whether the retry executor should retry this kind of failure.
    pub fn retryable(&self) -> bool {
        self.kind().retryable()
    }

    /// How the circuit breaker should treat this outcome.
    pub fn breaker_verdict(&self) -> BreakerVerdict {
        self.kind().breaker_verdict()
    }

    /// Whether the orchestrator should consult the stale cache before
    /// surfacing this error to the client.
    pub fn stale_eligible(&self) -> bool {
        self.kind().stale_eligible()
    }
}

impl ErrorKind {
    /// The canonical HTTP status for this error kind (spec §7).
    pub fn http_status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Auth => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::Transport => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::ServerError => 502,
            ErrorKind::Malformed => 502,
            ErrorKind::BreakerOpen => 503,
        }
    }

    /// Whether the retry executor should retry this kind of failure.
    ///
    /// `NotFound`, `Auth`, and `RateLimited` indicate the answer, not a
    /// transient outage — retrying them would just hammer upstream.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::ServerError | ErrorKind::Malformed
        )
    }

    /// How the circuit breaker should treat this outcome.
    ///
    /// `NotFound` and `Auth` are successful round trips from the breaker's
    /// perspective — the upstream answered promptly. `BadRequest` never
    /// reaches the breaker at all (it never leaves the orchestrator).
    pub fn breaker_verdict(self) -> BreakerVerdict {
        match self {
            ErrorKind::Auth | ErrorKind::NotFound => BreakerVerdict::Success,
            ErrorKind::RateLimited
            | ErrorKind::Transport
            | ErrorKind::Timeout
            | ErrorKind::ServerError
            | ErrorKind::Malformed => BreakerVerdict::Failure,
            ErrorKind::BadRequest | ErrorKind::BreakerOpen => BreakerVerdict::None,
        }
    }

    /// Whether the orchestrator should consult the stale cache before
    /// surfacing this error. `NotFound`/`Auth` indicate the answer, not an
    /// outage, so stale data must not be used to mask them.
    pub fn stale_eligible(self) -> bool {
        !matches!(
            self,
            ErrorKind::BadRequest | ErrorKind::Auth | ErrorKind::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_matches_spec() {
        assert_eq!(ErrorKind::BadRequest.http_status_code(), 400);
        assert_eq!(ErrorKind::Auth.http_status_code(), 401);
        assert_eq!(ErrorKind::NotFound.http_status_code(), 404);
        assert_eq!(ErrorKind::RateLimited.http_status_code(), 429);
        assert_eq!(ErrorKind::Transport.http_status_code(), 502);
        assert_eq!(ErrorKind::Timeout.http_status_code(), 504);
        assert_eq!(ErrorKind::ServerError.http_status_code(), 502);
        assert_eq!(ErrorKind::Malformed.http_status_code(), 502);
        assert_eq!(ErrorKind::BreakerOpen.http_status_code(), 503);
    }

    #[test]
    fn client_errors_are_not_retryable_and_not_stale_eligible() {
        for kind in [ErrorKind::NotFound, ErrorKind::Auth, ErrorKind::RateLimited] {
            assert!(!kind.retryable(), "{kind} should not be retried");
        }
        assert!(!ErrorKind::NotFound.stale_eligible());
        assert!(!ErrorKind::Auth.stale_eligible());
        assert!(ErrorKind::RateLimited.stale_eligible());
    }

    #[test]
    fn breaker_treats_not_found_and_auth_as_success() {
        assert_eq!(ErrorKind::NotFound.breaker_verdict(), BreakerVerdict::Success);
        assert_eq!(ErrorKind::Auth.breaker_verdict(), BreakerVerdict::Success);
        assert_eq!(ErrorKind::RateLimited.breaker_verdict(), BreakerVerdict::Failure);
    }

    #[test]
    fn kind_roundtrips_through_gateway_error() {
        let err = GatewayError::Transport("connection reset".into());
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.retryable());
        assert_eq!(err.http_status_code(), 502);
    }
}
