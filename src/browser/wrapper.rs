//! Browser process lifecycle
//!
//! Launches one chromiumoxide browser per request and tears it down with an
//! explicit close/wait/cleanup sequence.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide_cdp::cdp::browser_protocol::target::CreateBrowserContextParams;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::context::ChromeContext;
use super::{BrowserEngine, BrowserError, BrowserLauncher, BrowserResult, ContextProfile};
use crate::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// Handler MUST be aborted when the wrapper goes away, otherwise it keeps
/// polling a dead websocket. Fields drop in order: the browser process is
/// killed before its profile directory is removed.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: ProfileDir,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            profile: ProfileDir::new(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close Chrome, wait for the process to exit, then remove its profile.
    ///
    /// `close()` alone leaves a zombie; `wait()` reaps it and releases the
    /// profile's file handles so the directory can be removed.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }

        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        self.cleanup_temp_dir();
    }

    /// Remove the profile directory (blocking, usable from Drop)
    pub fn cleanup_temp_dir(&mut self) {
        self.profile.remove();
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(path) = self.profile.path() {
            warn!(
                "BrowserWrapper dropped without shutdown(); killing browser and removing {}",
                path.display()
            );
        }
        // Browser::drop kills the Chrome process, then ProfileDir::drop removes the profile
    }
}

/// Per-launch Chrome profile directory, removed at most once
#[derive(Debug)]
struct ProfileDir {
    path: Option<PathBuf>,
}

impl ProfileDir {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn remove(&mut self) {
        if let Some(path) = self.path.take() {
            debug!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Launch a browser with a fresh, uniquely named profile directory
pub async fn launch_browser(config: &BrowserConfig) -> BrowserResult<BrowserWrapper> {
    let user_data_dir = std::env::temp_dir().join(format!(
        "url_digest_{}_{}",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));

    let (browser, handler) =
        crate::browser_setup::launch_browser(config, user_data_dir.clone()).await?;

    Ok(BrowserWrapper::new(browser, handler, user_data_dir))
}

/// Launches headless Chromium via chromiumoxide
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Engine = ChromeEngine;

    async fn launch(&self) -> BrowserResult<ChromeEngine> {
        info!("Launching browser");
        let wrapper = launch_browser(&self.config).await?;
        Ok(ChromeEngine {
            browser: Arc::new(Mutex::new(Some(wrapper))),
        })
    }
}

/// A running Chromium process
///
/// The wrapper sits behind `Arc<Mutex<Option<_>>>` so contexts can reach the
/// browser for target management while `close` can still take it out.
pub struct ChromeEngine {
    browser: Arc<Mutex<Option<BrowserWrapper>>>,
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    type Context = ChromeContext;

    async fn new_context(&self, profile: &ContextProfile) -> BrowserResult<ChromeContext> {
        let guard = self.browser.lock().await;
        let wrapper = guard.as_ref().ok_or(BrowserError::Closed)?;

        let created = wrapper
            .browser()
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::ContextCreationFailed(e.to_string()))?;
        drop(guard);

        let context_id = created.result.browser_context_id;
        debug!("Created browser context {:?}", context_id);

        Ok(ChromeContext::new(
            self.browser.clone(),
            context_id,
            profile.clone(),
        ))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let mut guard = self.browser.lock().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");
            wrapper.shutdown().await;
        }

        Ok(())
    }
}
