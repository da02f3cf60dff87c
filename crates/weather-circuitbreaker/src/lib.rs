//! Three-state circuit breaker with dual-trigger opening.
//!
//! Opens on either of two independent triggers evaluated after each
//! recorded failure: a run of `consecutive_failures` reaching
//! `failure_threshold`, or the failure rate over the last (up to) 20
//! outcomes reaching `rate_threshold` once at least 5 samples exist. The
//! Open → HalfOpen transition is lazy: it happens on the next admission
//! check once `recovery_timeout` has elapsed, not on a background timer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use weather_core::{BreakerVerdict, Clock};
use weather_metrics::MetricsRegistry;

const OUTCOME_RING_CAPACITY: usize = 20;
const MIN_SAMPLES_FOR_RATE_TRIGGER: usize = 5;

/// The three states a breaker may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

/// Tunables for a [`CircuitBreaker`]. Defaults match spec §4.5.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: f64,
    pub rate_threshold: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_seconds: 60.0,
            rate_threshold: 0.5,
        }
    }
}

struct Inner {
    consecutive_failures: u32,
    recent_outcomes: VecDeque<bool>,
    opened_at: Option<f64>,
}

/// Rejection returned when the breaker denies admission outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerOpen;

/// A three-state circuit breaker guarding calls to an unreliable
/// dependency.
///
/// Only [`BreakerVerdict::Success`] and [`BreakerVerdict::Failure`] affect
/// state; [`BreakerVerdict::None`] is a no-op, which is how callers keep
/// client-error kinds (bad input) from ever influencing the breaker.
pub struct CircuitBreaker<C: Clock> {
    clock: Arc<C>,
    metrics: Arc<MetricsRegistry>,
    config: BreakerConfig,
    state: AtomicU8,
    inner: Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(clock: Arc<C>, metrics: Arc<MetricsRegistry>, config: BreakerConfig) -> Self {
        Self {
            clock,
            metrics,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            inner: Mutex::new(Inner {
                consecutive_failures: 0,
                recent_outcomes: VecDeque::with_capacity(OUTCOME_RING_CAPACITY),
                opened_at: None,
            }),
        }
    }

    /// The current state, performing the lazy Open→HalfOpen transition if
    /// the recovery timeout has elapsed. Reading this does not itself
    /// consume the HalfOpen probe slot; call [`Self::admit`] for that.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Checks whether a call may proceed, performing the lazy
    /// Open→HalfOpen transition when due. Returns `Err(BreakerOpen)` when
    /// the caller must not invoke the dependency.
    ///
    /// HalfOpen permits exactly one in-flight probe: the first admission
    /// check after the Open→HalfOpen transition succeeds, and any further
    /// admission check while still HalfOpen is rejected until that probe's
    /// outcome is recorded.
    pub fn admit(&self) -> Result<(), BreakerOpen> {
        let mut inner = self.inner.lock().unwrap();
        match self.state() {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let opened_at = inner.opened_at.expect("opened_at set while Open");
                if self.clock.now() - opened_at >= self.config.recovery_timeout_seconds {
                    self.transition_to(&mut inner, CircuitState::HalfOpen);
                    Ok(())
                } else {
                    Err(BreakerOpen)
                }
            }
            CircuitState::HalfOpen => Err(BreakerOpen),
        }
    }

    /// Records a successful call outcome (per [`BreakerVerdict`]).
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match self.state() {
            CircuitState::HalfOpen => {
                self.transition_to(&mut inner, CircuitState::Closed);
            }
            _ => {
                inner.consecutive_failures = 0;
                push_outcome(&mut inner.recent_outcomes, true);
            }
        }
    }

    /// Records a failed call outcome (per [`BreakerVerdict`]).
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match self.state() {
            CircuitState::HalfOpen => {
                self.transition_to(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                push_outcome(&mut inner.recent_outcomes, false);
                if self.should_open(&inner) {
                    self.transition_to(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::Open => {
                // Admission already rejects calls while Open; a failure
                // recorded here would only arrive from a stale in-flight
                // probe. Ignore it rather than re-opening an open breaker.
            }
        }
    }

    /// Records an outcome according to a [`BreakerVerdict`], a no-op for
    /// [`BreakerVerdict::None`].
    pub fn record(&self, verdict: BreakerVerdict) {
        match verdict {
            BreakerVerdict::Success => self.record_success(),
            BreakerVerdict::Failure => self.record_failure(),
            BreakerVerdict::None => {}
        }
    }

    fn should_open(&self, inner: &Inner) -> bool {
        if inner.consecutive_failures >= self.config.failure_threshold {
            return true;
        }
        let n = inner.recent_outcomes.len();
        if n < MIN_SAMPLES_FOR_RATE_TRIGGER {
            return false;
        }
        let failures = inner.recent_outcomes.iter().filter(|ok| !**ok).count();
        (failures as f64 / n as f64) >= self.config.rate_threshold
    }

    fn transition_to(&self, inner: &mut Inner, to: CircuitState) {
        let from = self.state();
        if from == to {
            return;
        }
        match to {
            CircuitState::Open => {
                inner.opened_at = Some(self.clock.now());
                if from != CircuitState::HalfOpen {
                    self.metrics.record_breaker_open();
                }
            }
            CircuitState::HalfOpen => {
                // opened_at carries over; the probe must still complete
                // within its own accounting once recorded.
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.consecutive_failures = 0;
                inner.recent_outcomes.clear();
            }
        }
        tracing::info!(from = %from, to = %to, "circuit breaker transition");
        self.state.store(to as u8, Ordering::Release);
    }
}

fn push_outcome(ring: &mut VecDeque<bool>, ok: bool) {
    if ring.len() >= OUTCOME_RING_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(ok);
}
