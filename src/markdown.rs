//! HTML fragment to normalized markdown

use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, CodeBlockFence, CodeBlockStyle, HeadingStyle, Options};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Elements dropped together with their content before conversion
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "img", "iframe", "a"];

static EMPTY_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*-[ \t]*(?:\n|$)").expect("valid empty bullet regex"));

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").expect("valid newline regex"));

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            code_block_fence: CodeBlockFence::Backticks,
            ..Default::default()
        })
        .build()
}

/// Convert an article fragment and normalize the result
///
/// `None` when the converter fails.
pub fn to_markdown(html: &str) -> Option<String> {
    match converter().convert(html) {
        Ok(markdown) => Some(normalize_markdown(&markdown)),
        Err(e) => {
            warn!("Markdown conversion failed: {}", e);
            None
        }
    }
}

/// Drop empty bullets, collapse blank-line runs to a single newline, trim
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_markdown(markdown: &str) -> String {
    let without_bullets = EMPTY_BULLET.replace_all(markdown, "");
    let collapsed = BLANK_RUN.replace_all(&without_bullets, "\n");
    collapsed.trim().to_string()
}
