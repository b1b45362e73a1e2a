//! Content-readiness detection
//!
//! Decides "is there enough on the page to extract" without sleeping for a
//! fixed delay. A page is ready once it shows a heading or og:title element,
//! a main/article/role=main/.content container, or more than 100 characters
//! of body text.

use std::time::Duration;

use crate::browser::PageHandle;
use crate::utils::poll_until;

/// Poll the readiness predicate until it holds or `timeout` passes
///
/// Returns `false` on timeout; never errors.
pub async fn wait_for_readable_content<P: PageHandle + ?Sized>(page: &P, timeout: Duration) -> bool {
    poll_until(timeout, || page.has_readable_content()).await
}
