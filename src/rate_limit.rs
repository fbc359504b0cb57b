//! Fixed-window request counter per client identifier.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Counts requests per client in fixed windows of `window` length.
///
/// A client may be admitted up to `2 * max_requests` times around a window
/// boundary. The map of tracked clients is capped at `max_clients`.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    max_clients: usize,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_capacity(max_requests, window, usize::MAX)
    }

    pub fn with_capacity(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: max_requests.max(1),
            window,
            max_clients: max_clients.max(1),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Records a request from `client_id` and reports whether it exceeds the
    /// quota. A rejected request does not touch the stored window.
    pub fn is_rate_limited(&self, client_id: &str) -> bool {
        let now = Instant::now();
        if !self.windows.contains_key(client_id) {
            self.make_room(now);
        }

        let mut window = self
            .windows
            .entry(client_id.to_owned())
            .or_insert(Window { count: 0, reset_at: now });

        if now >= window.reset_at {
            window.count = 1;
            window.reset_at = now + self.window;
            return false;
        }

        if window.count < self.max_requests {
            window.count += 1;
            return false;
        }

        true
    }

    /// When the client's current window ends, or now if it has none.
    pub fn reset_time(&self, client_id: &str) -> Instant {
        self.windows
            .get(client_id)
            .map(|window| window.reset_at)
            .unwrap_or_else(Instant::now)
    }

    /// Whole seconds until the client's window resets, rounded up.
    pub fn retry_after_secs(&self, client_id: &str) -> u64 {
        let remaining = self.reset_time(client_id).saturating_duration_since(Instant::now());
        remaining.as_millis().div_ceil(1000) as u64
    }

    /// Drop windows that have already reset. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    fn make_room(&self, now: Instant) {
        if self.windows.len() < self.max_clients {
            return;
        }
        self.windows.retain(|_, window| window.reset_at > now);
        if self.windows.len() < self.max_clients {
            return;
        }

        let oldest = self
            .windows
            .iter()
            .min_by_key(|entry| entry.reset_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!(client = %key, "rate limiter full, evicting oldest window");
            self.windows.remove(&key);
        }
    }
}
