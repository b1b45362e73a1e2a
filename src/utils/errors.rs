use thiserror::Error;

use crate::browser::BrowserError;

/// Fatal, pipeline-level failures
///
/// Everything else in the pipeline degrades to empty fields or fallback
/// content, so these are the only errors a caller of `Scraper::scrape` sees.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Browser launch failed: {0}")]
    Launch(BrowserError),

    #[error("Browsing context setup failed: {0}")]
    Context(BrowserError),

    #[error("Navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },
}

impl ScrapeError {
    /// True when navigation hit the hard DOMContentLoaded deadline
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ScrapeError::Navigation {
                source: BrowserError::NavigationTimeout(_),
                ..
            }
        )
    }
}
