//! Primary-content extraction
//!
//! Serializes the rendered document and runs the Readability heuristics
//! (dom_smoothie, an embedded port of Mozilla Readability) over it. Nothing is
//! fetched at runtime. Failure is an expected outcome: it yields `None` and
//! the caller falls back to the page description.

use dom_smoothie::{Config, Readability};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::PageHandle;

/// Upper bound on elements the readability pass will score
const MAX_ELEMENTS_TO_PARSE: usize = 20_000;

/// Article candidate produced by the readability pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    /// Cleaned HTML fragment of the article body
    pub content: String,
}

/// Snapshot the live document and isolate its main article
///
/// Returns `None` when the snapshot fails, the algorithm errors, or the
/// result has no content.
pub async fn extract_article<P: PageHandle + ?Sized>(page: &P, url: &str) -> Option<ExtractedArticle> {
    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            warn!("Readability skipped, document snapshot failed: {}", e);
            return None;
        }
    };

    let document_url = url.to_string();
    let parsed = tokio::task::spawn_blocking(move || parse_article(&html, Some(&document_url))).await;

    match parsed {
        Ok(Ok(Some(article))) => {
            debug!(
                "Readability extracted {} bytes titled {:?}",
                article.content.len(),
                article.title
            );
            Some(article)
        }
        Ok(Ok(None)) => {
            warn!("Readability produced no content for {}", url);
            None
        }
        Ok(Err(e)) => {
            warn!("Readability failed for {}: {}", url, e);
            None
        }
        Err(e) => {
            warn!("Readability task failed for {}: {}", url, e);
            None
        }
    }
}

/// Run Readability with class stripping over `html`
///
/// `Ok(None)` means the algorithm ran but found nothing worth keeping.
pub fn parse_article(
    html: &str,
    url: Option<&str>,
) -> Result<Option<ExtractedArticle>, dom_smoothie::ReadabilityError> {
    let cfg = Config {
        keep_classes: false,
        max_elements_to_parse: MAX_ELEMENTS_TO_PARSE,
        ..Default::default()
    };

    let mut readability = Readability::new(html, url, Some(cfg))?;
    let article = readability.parse()?;

    let content = article.content.to_string();
    if content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(ExtractedArticle {
        title: article.title.trim().to_string(),
        content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = r#"<html><head><title>Harbor Notes</title></head><body>
        <nav><ul><li>Home</li><li>Archive</li><li>About</li></ul></nav>
        <article>
          <h1>Harbor Notes</h1>
          <p class="lede">The harbor was quiet in the early morning, and the boats rocked gently against their moorings while the gulls circled overhead looking for scraps.</p>
          <p class="body">Fishermen arrived one by one, unloading crates and checking nets that had been mended the night before. The smell of salt and diesel hung in the air as the sun climbed.</p>
          <p class="body">By noon the market stalls were full, and buyers from the town argued cheerfully over prices while children ran between the piles of rope and tackle.</p>
        </article>
        <footer>Copyright</footer>
        </body></html>"#;

    #[test]
    fn isolates_article_body() {
        let article = parse_article(STORY, Some("https://example.com/harbor"))
            .unwrap()
            .unwrap();
        assert!(article.content.contains("boats rocked gently"));
        assert!(article.content.contains("market stalls were full"));
        assert!(!article.content.contains("Copyright"));
    }

    #[test]
    fn strips_classes() {
        let article = parse_article(STORY, None).unwrap().unwrap();
        assert!(!article.content.contains("lede"));
        assert!(!article.content.contains(r#"class="body""#));
    }

    #[test]
    fn reports_document_title() {
        let article = parse_article(STORY, None).unwrap().unwrap();
        assert_eq!(article.title, "Harbor Notes");
    }
}
