//! Per-client submission rate limiting.
//!
//! Process-local and best-effort: counters vanish on restart and are not
//! shared between instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Decides whether a client may submit another lead.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key` and report whether it is allowed.
    fn check(&self, key: &str) -> bool;
}

/// Allows everything.
pub struct NoopLimiter;

impl RateLimiter for NoopLimiter {
    fn check(&self, _key: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window counter keyed by client identifier.
///
/// The first attempt from a key opens a window; up to `max` attempts are
/// allowed until `window` has elapsed since it opened.
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    entries: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// `check` against an explicit clock reading.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(w) = entries.get_mut(key)
            && now.saturating_duration_since(w.started) <= self.window
        {
            if w.count >= self.max {
                warn!(client = key, count = w.count, "Rate limit exceeded");
                return false;
            }
            w.count += 1;
            return true;
        }

        if self.max == 0 {
            return false;
        }
        entries.insert(
            key.to_string(),
            Window {
                count: 1,
                started: now,
            },
        );
        true
    }

    /// Drop windows that have elapsed. Returns how many were removed.
    pub fn prune_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, w| now.saturating_duration_since(w.started) <= self.window);
        before - entries.len()
    }

    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }
}

/// Spawn a background task that periodically drops elapsed windows.
pub fn spawn_prune_task(
    limiter: Arc<FixedWindowLimiter>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = limiter.prune();
            if removed > 0 {
                debug!(removed, remaining = limiter.tracked(), "Pruned rate-limit windows");
            }
        }
    })
}
