//! Per-IP fixed-window rate limiting, ahead of the resilience core.
//!
//! Deliberately minimal: a single shared map of IP to (window start,
//! count), reset whenever a request arrives in a new 60-second window.
//! This sits outside the resilience core proper — it protects the
//! process from its own clients, not from the upstream dependency.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    limit_per_minute: u32,
    window: Mutex<HashMap<IpAddr, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            window: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `addr` is within its per-minute budget, recording
    /// the request either way (rejected requests still count, matching a
    /// fixed-window limiter's usual semantics).
    pub fn check(&self, addr: IpAddr) -> bool {
        let mut window = self.window.lock().unwrap();
        let now = Instant::now();
        let entry = window.entry(addr).or_insert((now, 0));

        if now.duration_since(entry.0) >= Duration::from_secs(60) {
            *entry = (now, 0);
        }

        entry.1 += 1;
        entry.1 <= self.limit_per_minute
    }
}
