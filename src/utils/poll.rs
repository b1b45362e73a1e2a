//! Condition polling with exponential backoff
//!
//! Pages keep mutating after DOMContentLoaded: SPAs render their content via
//! JavaScript long after the milestone fires. `poll_until` re-checks a DOM
//! condition until it holds or a deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// First delay between checks
pub const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cap on the delay between checks
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Re-run `check` until it returns `true` or `timeout` elapses
///
/// A check that errors counts as "not yet". Returns whether the condition was
/// observed before the deadline.
///
/// # Polling Strategy
/// - Starts at 100ms intervals
/// - Doubles each retry (exponential backoff)
/// - Caps at 1 second maximum interval
/// - Each check is itself bounded by the time remaining
pub async fn poll_until<F, Fut, E>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let deadline = Instant::now() + timeout;
    let mut poll_interval = INITIAL_POLL_INTERVAL;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }

        if let Ok(Ok(true)) = tokio::time::timeout(remaining, check()).await {
            return true;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }

        tokio::time::sleep(poll_interval.min(remaining)).await;

        poll_interval = (poll_interval * 2).min(MAX_POLL_INTERVAL);
    }
}
