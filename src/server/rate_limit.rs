//! Per-client fixed-window request counting.
//!
//! [`ClientRateLimiter`] is owned by the router state rather than living in a
//! global, so tests can build one, drive it with explicit instants, and reset
//! it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use patent_bundler::server::{ClientRateLimiter, RateDecision};
//!
//! let limiter = ClientRateLimiter::new(2, Duration::from_secs(60));
//! assert!(matches!(limiter.check("203.0.113.7"), RateDecision::Allowed { remaining: 1 }));
//! assert!(matches!(limiter.check("203.0.113.7"), RateDecision::Allowed { remaining: 0 }));
//! assert!(matches!(limiter.check("203.0.113.7"), RateDecision::Limited { .. }));
//! ```

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;
use tracing::debug;

/// Default requests per client per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Key used when no client identity is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted.
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
    },
    /// Request rejected until the window rolls over.
    Limited {
        /// Time until the current window ends.
        retry_after: Duration,
    },
}

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client identity.
///
/// Clients whose window has ended are evicted at most once per window, so
/// the map only holds clients seen within roughly the last two windows.
///
/// `Send + Sync`; share it behind `Arc`.
#[derive(Debug)]
pub struct ClientRateLimiter {
    max_requests: u32,
    window: Duration,
    disabled: bool,
    clients: DashMap<String, WindowCounter>,
    last_sweep: Mutex<Instant>,
}

impl ClientRateLimiter {
    /// Allows `max_requests` per client per `window`. A limit of 0 disables counting.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            disabled: max_requests == 0 || window.is_zero(),
            clients: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// A limiter that admits everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0, DEFAULT_WINDOW)
    }

    /// Returns true if every request is admitted.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Counts a request from `key` now.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Counts a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.disabled {
            return RateDecision::Allowed {
                remaining: u32::MAX,
            };
        }

        self.evict_expired(now);

        let mut entry = self
            .clients
            .entry(key.to_string())
            .or_insert(WindowCounter {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            debug!(client = key, count = entry.count, "request rate limited");
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Drops clients whose window ended, if a window has passed since the last sweep.
    fn evict_expired(&self, now: Instant) {
        // Another caller is already sweeping.
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < self.window {
            return;
        }
        *last_sweep = now;

        let before = self.clients.len();
        self.clients
            .retain(|_, counter| now.saturating_duration_since(counter.started) < self.window);
        debug!(
            evicted = before.saturating_sub(self.clients.len()),
            tracked = self.clients.len(),
            "evicted expired rate-limit windows"
        );
    }

    /// Forgets every client.
    pub fn reset(&self) {
        self.clients.clear();
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ClientRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Client identity: first `X-Forwarded-For` entry, else peer IP, else `unknown`.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
