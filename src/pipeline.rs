//! End-to-end scrape of one URL
//!
//! open session, start probes, wait for readiness, strip images, settle the
//! probes while readability runs, close the context, convert to markdown,
//! assemble, close the browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{BrowserLauncher, ChromeLauncher, ContextProfile};
use crate::manager::SessionManager;
use crate::markdown::to_markdown;
use crate::page_extractor::{ExtractedArticle, MetadataRacer, PageMetadata, ProbeValues, extract_article};
use crate::utils::constants::{DEFAULT_TITLE, FALLBACK_CONTENT};
use crate::utils::{ScrapeError, validate_navigation_timeout, validate_probe_timeout};
use crate::{Config, load_yaml_config};

/// A single scrape job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Metadata plus normalized markdown; `content` is never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub metadata: PageMetadata,
    pub content: String,
}

/// Combine metadata and the optional article into the final result
///
/// With a usable article the markdown becomes the content and the title falls
/// back to the article title only when metadata had none. Without one the
/// description (or a fixed notice) stands in for the content.
pub fn assemble(
    mut metadata: PageMetadata,
    article: Option<&ExtractedArticle>,
    markdown: Option<&str>,
) -> ScrapeResult {
    match (article, markdown) {
        (Some(article), Some(markdown)) if !markdown.is_empty() => {
            if metadata.has_default_title() {
                let article_title = article.title.trim();
                if !article_title.is_empty() {
                    metadata.title = article_title.to_string();
                }
            }
            ScrapeResult {
                metadata,
                content: markdown.to_string(),
            }
        }
        _ => {
            let content = if metadata.description.is_empty() {
                FALLBACK_CONTENT.to_string()
            } else {
                metadata.description.clone()
            };
            if metadata.title.is_empty() {
                metadata.title = DEFAULT_TITLE.to_string();
            }
            ScrapeResult { metadata, content }
        }
    }
}

/// Anything able to turn a URL into a [`ScrapeResult`]
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError>;
}

/// Scrape pipeline over a browser launcher
pub struct Scraper<L: BrowserLauncher> {
    sessions: SessionManager<L>,
    racer: MetadataRacer,
}

impl<L: BrowserLauncher> Scraper<L> {
    pub fn new(
        launcher: L,
        profile: ContextProfile,
        navigation_timeout: Duration,
        metadata_timeout: Duration,
    ) -> Self {
        Self {
            sessions: SessionManager::new(launcher, profile, navigation_timeout),
            racer: MetadataRacer::new(metadata_timeout),
        }
    }

    /// Run the full pipeline for one request
    ///
    /// # Errors
    /// Only launch, context creation and navigation failures are returned.
    /// Everything after navigation degrades instead of failing.
    pub async fn run(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let mut session = self.sessions.open(request).await?;

        let (probes, article) = match session.page() {
            Some(page) => {
                let pending = self.racer.start(page);
                let readiness = pending.wait_ready().await;
                debug!("Readiness for {}: {:?}", request.url, readiness);

                let extraction = async {
                    session.strip_images().await;
                    extract_article(page, &request.url).await
                };
                futures::join!(pending.settle(), extraction)
            }
            None => (ProbeValues::default(), None),
        };

        session.close_context().await;

        let metadata = PageMetadata::from_probes(&probes);
        let markdown = article
            .as_ref()
            .and_then(|article| to_markdown(&article.content));
        let result = assemble(metadata, article.as_ref(), markdown.as_deref());

        self.sessions.close(session).await;

        info!(
            "Scraped {} ({} chars, title {:?})",
            request.url,
            result.content.len(),
            result.metadata.title
        );
        Ok(result)
    }
}

impl Scraper<ChromeLauncher> {
    /// Chromium-backed scraper with validated timeouts from `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let navigation_timeout =
            validate_navigation_timeout(config.extraction.navigation_timeout_ms)?;
        let metadata_timeout = validate_probe_timeout(config.extraction.metadata_timeout_ms)?;

        Ok(Self::new(
            ChromeLauncher::new(config.browser.clone()),
            ContextProfile::from_config(&config.browser),
            navigation_timeout,
            metadata_timeout,
        ))
    }
}

#[async_trait]
impl<L> PageScraper for Scraper<L>
where
    L: BrowserLauncher + 'static,
{
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError> {
        self.run(&ScrapeRequest::new(url)).await
    }
}

/// Scrape `url` with the Chromium launcher and the discovered configuration
pub async fn scrape_url(url: &str) -> anyhow::Result<ScrapeResult> {
    let config = load_yaml_config(None)?;
    let scraper = Scraper::from_config(&config)?;
    Ok(scraper.scrape(url).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(title: &str, description: &str) -> PageMetadata {
        PageMetadata {
            title: title.into(),
            description: description.into(),
            site_name: String::new(),
        }
    }

    fn article(title: &str) -> ExtractedArticle {
        ExtractedArticle {
            title: title.into(),
            content: "<p>body</p>".into(),
        }
    }

    #[test]
    fn markdown_wins_over_description() {
        let result = assemble(
            metadata("Example Site", "desc"),
            Some(&article("Readable")),
            Some("# Hello\nworld"),
        );
        assert_eq!(result.content, "# Hello\nworld");
        assert_eq!(result.metadata.title, "Example Site");
    }

    #[test]
    fn article_title_replaces_default_title() {
        let result = assemble(metadata("Untitled", ""), Some(&article("  Story  ")), Some("text"));
        assert_eq!(result.metadata.title, "Story");
    }

    #[test]
    fn default_title_survives_blank_article_title() {
        let result = assemble(metadata("Untitled", ""), Some(&article("   ")), Some("text"));
        assert_eq!(result.metadata.title, "Untitled");
    }

    #[test]
    fn missing_article_falls_back_to_description() {
        let result = assemble(metadata("T", "Fallback desc"), None, None);
        assert_eq!(result.content, "Fallback desc");
        assert_eq!(result.metadata.title, "T");
    }

    #[test]
    fn empty_markdown_falls_back_to_description() {
        let result = assemble(metadata("T", "Fallback desc"), Some(&article("A")), Some(""));
        assert_eq!(result.content, "Fallback desc");
        assert_eq!(result.metadata.title, "T");
    }

    #[test]
    fn failed_conversion_without_description_uses_notice() {
        let result = assemble(metadata("T", ""), Some(&article("A")), None);
        assert_eq!(
            result.content,
            "Content extraction failed, but metadata was collected successfully."
        );
    }

    #[test]
    fn content_is_never_empty() {
        for (article, markdown) in [
            (None, None),
            (Some(article("A")), Some("")),
            (Some(article("A")), Some("x")),
        ] {
            let result = assemble(PageMetadata::default(), article.as_ref(), markdown);
            assert!(!result.content.is_empty());
            assert!(!result.metadata.title.is_empty());
        }
    }

    #[test]
    fn result_serializes_with_nested_metadata() {
        let result = assemble(metadata("T", "d"), None, None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["metadata"]["siteName"], "");
        assert_eq!(json["content"], "d");
    }
}
