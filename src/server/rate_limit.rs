//! Fixed-window request limiter keyed by client address

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::AppState;

pub const RATE_LIMITED_MESSAGE: &str = "Too Many Requests: Rate limit exceeded";

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Per-client counters shared by every request
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &crate::RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count a request from `key`; `false` when its window is exhausted
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            resets_at: now + self.window,
        });

        if now > entry.resets_at {
            *entry = Window {
                count: 1,
                resets_at: now + self.window,
            };
            return true;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Drop windows that have already reset, returning how many went away
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.resets_at);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Periodically clear expired windows until the task is aborted
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep_expired();
            if removed > 0 {
                debug!("Swept {} expired rate-limit windows", removed);
            }
        }
    })
}

/// First `x-forwarded-for` entry, else `x-real-ip`, else `"unknown"`
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded.or(real_ip).unwrap_or("unknown").to_string()
}

pub async fn enforce_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(request.headers());
    if !state.limiter.check(&key) {
        warn!("Rate limit exceeded for {}", key);
        return (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE).into_response();
    }
    next.run(request).await
}
