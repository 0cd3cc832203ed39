//! Admission quota enforcement, keyed by caller access key.
//!
//! Two independent limits must both pass: a token bucket smooths bursts
//! while a fixed-window daily counter bounds total cost.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::config::QuotaConfig;

const SECS_PER_DAY: u64 = 86_400;

/// Time source for the enforcer. Injected so window math is deterministic
/// under test.
pub trait Clock: Send + Sync {
    /// Monotonic seconds since an arbitrary fixed origin.
    fn monotonic_secs(&self) -> f64;
    /// Wall-clock seconds since the unix epoch.
    fn unix_secs(&self) -> u64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("request rate exceeded, retry later")]
    RateExceeded,

    #[error("daily request quota exhausted")]
    DailyQuotaExceeded,
}

/// Per-caller admission state: bucket level plus the current day window.
struct CallerState {
    tokens: f64,
    last_refill: f64,
    day: u64,
    day_count: u64,
    last_seen: f64,
}

struct Inner {
    callers: HashMap<String, CallerState>,
    last_sweep: f64,
}

/// Token-bucket plus daily fixed-window admission control.
///
/// Keyed by the caller's access key, not the authenticated owner, and safe
/// under concurrent requests. Entries for idle callers are evicted on a TTL.
pub struct QuotaEnforcer {
    inner: Mutex<Inner>,
    clock: Box<dyn Clock>,
    rate_per_sec: f64,
    burst: f64,
    daily_limit: u64,
    idle_ttl_secs: f64,
}

impl QuotaEnforcer {
    pub fn new(config: &QuotaConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                callers: HashMap::new(),
                last_sweep: 0.0,
            }),
            clock,
            rate_per_sec: config.rate_per_sec as f64,
            burst: config.burst as f64,
            daily_limit: config.daily_limit,
            idle_ttl_secs: config.idle_ttl_secs as f64,
        }
    }

    /// Admit or reject one call for `caller_key`. Both the bucket and the
    /// daily window must pass; the daily counter tracks attempts, so
    /// rejected calls still count against it.
    pub fn admit(&self, caller_key: &str) -> Result<(), QuotaError> {
        let now = self.clock.monotonic_secs();
        let day = self.clock.unix_secs() / SECS_PER_DAY;

        let mut inner = self.inner.lock().expect("quota mutex poisoned");

        if now - inner.last_sweep >= self.idle_ttl_secs {
            let ttl = self.idle_ttl_secs;
            inner.callers.retain(|_, s| now - s.last_seen < ttl);
            inner.last_sweep = now;
        }

        let burst = self.burst;
        let state = inner
            .callers
            .entry(caller_key.to_string())
            .or_insert_with(|| CallerState {
                tokens: burst,
                last_refill: now,
                day,
                day_count: 0,
                last_seen: now,
            });

        state.last_seen = now;

        // Refill proportional to elapsed time, capped at the burst ceiling
        state.tokens = (state.tokens + (now - state.last_refill) * self.rate_per_sec).min(burst);
        state.last_refill = now;

        // Daily window rolls over at the UTC day boundary
        if state.day != day {
            state.day = day;
            state.day_count = 0;
        }
        state.day_count += 1;

        if state.day_count > self.daily_limit {
            return Err(QuotaError::DailyQuotaExceeded);
        }

        if state.tokens < 1.0 {
            return Err(QuotaError::RateExceeded);
        }
        state.tokens -= 1.0;
        Ok(())
    }

    /// Number of caller keys currently tracked. Exposed for eviction tests
    /// and operational introspection.
    pub fn tracked_callers(&self) -> usize {
        self.inner.lock().expect("quota mutex poisoned").callers.len()
    }
}
