//! Per-request browser session management
//!
//! A `Session` exclusively owns one browser process, one isolated browsing
//! context and one navigated page. Nothing is pooled or shared across
//! requests.
//!
//! # Release guarantees
//!
//! - `open` releases whatever it already acquired when a later step fails
//!   (context creation or navigation), so a failed open leaks nothing.
//! - `close_context` releases the context early, once extraction is done.
//! - `close` releases the context (if still open) and then the browser.
//!
//! Both are idempotent through `Option::take`, so every resource is closed
//! exactly once no matter how many exit paths call them. A session dropped
//! without `close` (panic, cancelled task) logs a warning; the chromiumoxide
//! browser kills its process on drop.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{
    BrowserEngine, BrowserLauncher, BrowsingContext, ContextProfile, PageHandle,
};
use crate::pipeline::ScrapeRequest;
use crate::utils::ScrapeError;

type ContextOf<L> = <<L as BrowserLauncher>::Engine as BrowserEngine>::Context;
type PageOf<L> = <ContextOf<L> as BrowsingContext>::Page;

/// Opens sessions with a fixed launcher, context profile and navigation timeout
pub struct SessionManager<L: BrowserLauncher> {
    launcher: L,
    profile: ContextProfile,
    navigation_timeout: Duration,
}

impl<L: BrowserLauncher> SessionManager<L> {
    pub fn new(launcher: L, profile: ContextProfile, navigation_timeout: Duration) -> Self {
        Self {
            launcher,
            profile,
            navigation_timeout,
        }
    }

    /// Launch a browser, create an isolated context and navigate to the request URL
    ///
    /// # Errors
    /// Launch, context creation and navigation failures (including the
    /// navigation timeout) are fatal for the request.
    pub async fn open(&self, request: &ScrapeRequest) -> Result<Session<L>, ScrapeError> {
        let mut engine = self
            .launcher
            .launch()
            .await
            .map_err(ScrapeError::Launch)?;

        let mut context = match engine.new_context(&self.profile).await {
            Ok(context) => context,
            Err(e) => {
                close_engine(&mut engine).await;
                return Err(ScrapeError::Context(e));
            }
        };

        let page = match context.open_page(&request.url, self.navigation_timeout).await {
            Ok(page) => page,
            Err(e) => {
                close_context(&mut context).await;
                close_engine(&mut engine).await;
                return Err(ScrapeError::Navigation {
                    url: request.url.clone(),
                    source: e,
                });
            }
        };

        info!("Session open for {}", request.url);

        Ok(Session {
            engine: Some(engine),
            context: Some(context),
            page: Some(page),
        })
    }

    /// Release the session (context first, then the browser process)
    pub async fn close(&self, session: Session<L>) {
        session.close().await;
    }
}

async fn close_context<C: BrowsingContext>(context: &mut C) {
    if let Err(e) = context.close().await {
        warn!("Failed to close browsing context: {}", e);
    }
}

async fn close_engine<E: BrowserEngine>(engine: &mut E) {
    if let Err(e) = engine.close().await {
        warn!("Failed to close browser: {}", e);
    }
}

/// One request's browser process, context and page
pub struct Session<L: BrowserLauncher> {
    engine: Option<L::Engine>,
    context: Option<ContextOf<L>>,
    page: Option<PageOf<L>>,
}

impl<L: BrowserLauncher> Session<L> {
    /// The navigated page, `None` once the context has been closed
    pub fn page(&self) -> Option<&PageOf<L>> {
        self.page.as_ref()
    }

    /// Remove every `<img>` from the document
    ///
    /// Best effort: failures only reduce extraction quality, so they are
    /// swallowed.
    pub async fn strip_images(&self) {
        let Some(page) = self.page.as_ref() else {
            return;
        };
        match page.remove_elements("img").await {
            Ok(removed) => debug!("Stripped {} image elements", removed),
            Err(e) => tracing::trace!("Image stripping failed: {}", e),
        }
    }

    /// Close the browsing context (and its page) while keeping the browser alive
    pub async fn close_context(&mut self) {
        self.page.take();
        if let Some(mut context) = self.context.take() {
            close_context(&mut context).await;
        }
    }

    /// Close the context if still open, then the browser process
    pub async fn close(mut self) {
        self.close_context().await;
        if let Some(mut engine) = self.engine.take() {
            close_engine(&mut engine).await;
        }
    }
}

impl<L: BrowserLauncher> Drop for Session<L> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            warn!("Session dropped without close(); browser will be killed on drop");
        }
    }
}
