//! Browser seams used by the extraction pipeline
//!
//! The pipeline talks to a rendered page only through the traits below.
//! `ChromeLauncher` implements them on top of chromiumoxide; tests plug in
//! in-memory pages.
//!
//! Ownership follows the request: a launcher produces one engine (browser
//! process), the engine produces one isolated context, the context produces
//! one navigated page. Contexts and engines are released with an explicit
//! async `close`, which must be called exactly once.

mod context;
mod wrapper;

pub use context::{ChromeContext, ChromePage};
pub use wrapper::{BrowserWrapper, ChromeEngine, ChromeLauncher, launch_browser};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::utils::constants::{CONTEXT_HEADERS, DESKTOP_USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to find browser executable: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create browsing context: {0}")]
    ContextCreationFailed(String),

    #[error("Failed to dispose browsing context: {0}")]
    ContextDisposeFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Browser already closed")]
    Closed,
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Per-context emulation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headers: Vec<(String, String)>,
}

impl ContextProfile {
    pub fn from_config(config: &crate::BrowserConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            viewport_width: config.window.width,
            viewport_height: config.window.height,
            ..Self::default()
        }
    }
}

impl Default for ContextProfile {
    fn default() -> Self {
        Self {
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            headers: CONTEXT_HEADERS
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }
}

/// A navigated page, queried by the metadata probes and the readability pass
///
/// Lookups return `Ok(None)` when the element or attribute is absent.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// `document.title`
    async fn title(&self) -> BrowserResult<Option<String>>;

    /// Attribute `name` of the first element matching `selector`
    async fn attribute(&self, selector: &str, name: &str) -> BrowserResult<Option<String>>;

    /// `textContent` of the first element matching `selector`
    async fn text_content(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// One evaluation of the readiness predicate
    async fn has_readable_content(&self) -> BrowserResult<bool>;

    /// Remove every element matching `selector`, returning how many went away
    async fn remove_elements(&self, selector: &str) -> BrowserResult<usize>;

    /// Serialized HTML of the live document
    async fn content(&self) -> BrowserResult<String>;
}

/// An isolated browsing context (cookies, cache, storage) owned by one request
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    type Page: PageHandle;

    /// Open a page and navigate it, returning once DOMContentLoaded fired
    async fn open_page(&self, url: &str, timeout: Duration) -> BrowserResult<Self::Page>;

    async fn close(&mut self) -> BrowserResult<()>;
}

/// A running browser process
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    type Context: BrowsingContext;

    async fn new_context(&self, profile: &ContextProfile) -> BrowserResult<Self::Context>;

    async fn close(&mut self) -> BrowserResult<()>;
}

/// Starts browser processes
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Engine: BrowserEngine;

    async fn launch(&self) -> BrowserResult<Self::Engine>;
}

/// Script evaluated by [`PageHandle::has_readable_content`] implementations
pub const READINESS_SCRIPT: &str = r#"(() => {
    const hasTitle = document.querySelector('h1, [property="og:title"]');
    const hasContent = document.querySelector('main, article, [role="main"], .content');
    const text = document.body && document.body.textContent ? document.body.textContent.trim() : '';
    return Boolean(hasTitle || hasContent || text.length > 100);
})()"#;
