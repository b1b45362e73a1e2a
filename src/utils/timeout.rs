//! Timeout validation and bounded-await helpers for browser operations

use std::future::Future;
use std::time::Duration;

/// Maximum timeout for navigation (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000;

/// Maximum timeout for a metadata probe or the readiness detector (1 minute)
pub const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;

/// Validate the configured navigation timeout
///
/// # Example
/// ```rust,ignore
/// let timeout = validate_navigation_timeout(15_000)?;
/// ```
pub fn validate_navigation_timeout(ms: u64) -> anyhow::Result<Duration> {
    validate(ms, MAX_NAVIGATION_TIMEOUT_MS, "navigation_timeout_ms")
}

/// Validate the configured probe/readiness timeout
pub fn validate_probe_timeout(ms: u64) -> anyhow::Result<Duration> {
    validate(ms, MAX_PROBE_TIMEOUT_MS, "metadata_timeout_ms")
}

fn validate(ms: u64, max_ms: u64, field: &str) -> anyhow::Result<Duration> {
    if ms == 0 {
        anyhow::bail!("{field} must be greater than zero");
    }
    if ms > max_ms {
        anyhow::bail!(
            "{field} cannot exceed {max_ms}ms ({:.1} seconds). Received: {ms}ms",
            max_ms as f64 / 1000.0
        );
    }
    Ok(Duration::from_millis(ms))
}

/// Await `fut` for at most `limit`, yielding `None` on expiry
///
/// The future is dropped when the deadline passes; whatever it would have
/// produced afterwards is discarded.
pub async fn settle_within<F, T>(limit: Duration, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut).await.ok()
}
