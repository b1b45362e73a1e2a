use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::BrowserConfig;
use crate::browser::{BrowserError, BrowserResult};
use crate::utils::constants::CHROME_ARGS;

/// Environment variable pointing at a Chrome/Chromium binary
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// RAII guard for the per-launch profile directory
///
/// Removes the directory on drop unless consumed by `into_path()`, so a
/// failed launch never leaves a profile behind.
struct TempDirGuard {
    path: PathBuf,
    keep: bool,
}

impl TempDirGuard {
    fn new(path: PathBuf) -> BrowserResult<Self> {
        std::fs::create_dir_all(&path).map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "Failed to create user data directory {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self { path, keep: false })
    }

    /// Hand the directory over to the caller (the launched browser owns it now)
    fn into_path(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to clean up temp dir {}: {}", self.path.display(), e);
            } else {
                debug!("Cleaned up temp dir after launch failure: {}", self.path.display());
            }
        }
    }
}

/// Find a Chrome/Chromium executable.
///
/// Search order: the explicit path (from config), `$CHROMIUM_PATH`, platform
/// install locations, then `which` on Unix.
pub async fn find_browser_executable(explicit: Option<&Path>) -> BrowserResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            info!("Using browser from config: {}", path.display());
            return Ok(path.to_path_buf());
        }
        warn!("Configured chrome_path does not exist: {}", path.display());
    }

    if let Ok(path) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from {}: {}", CHROMIUM_PATH_ENV, path.display());
            return Ok(path);
        }
        warn!(
            "{} points to non-existent file: {}",
            CHROMIUM_PATH_ENV,
            path.display()
        );
    }

    let candidates = if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "~/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let Some(path) = expand_candidate(candidate) else {
            continue;
        };
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which': {}", found);
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(BrowserError::NotFound(
        "no Chrome/Chromium executable on this system".to_string(),
    ))
}

fn expand_candidate(candidate: &str) -> Option<PathBuf> {
    if let Some(rest) = candidate.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else if candidate.contains('%') && cfg!(target_os = "windows") {
        Some(PathBuf::from(expand_windows_env_vars(candidate)))
    } else {
        Some(PathBuf::from(candidate))
    }
}

/// Expand `%VAR%` tokens; unknown variables are left as written.
fn expand_windows_env_vars(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }

        let var_name: String = chars.by_ref().take_while(|&c| c != '%').collect();
        if var_name.is_empty() {
            result.push('%');
        } else if let Ok(value) = std::env::var(&var_name) {
            result.push_str(&value);
        } else {
            result.push('%');
            result.push_str(&var_name);
            result.push('%');
        }
    }

    result
}

/// Download a managed Chromium build into the user cache directory.
pub async fn download_managed_browser() -> BrowserResult<PathBuf> {
    info!("Downloading managed Chromium browser...");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir().join(".cache"))
        .join("url-digest/chromium");

    std::fs::create_dir_all(&cache_dir)
        .map_err(|e| BrowserError::NotFound(format!("Failed to create cache directory: {e}")))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .map_err(|e| BrowserError::NotFound(format!("Failed to build fetcher options: {e}")))?;

    let revision_info = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| BrowserError::NotFound(format!("Failed to fetch browser: {e}")))?;

    info!("Downloaded Chromium to: {}", revision_info.folder_path.display());

    Ok(revision_info.executable_path)
}

/// Locate (or download) Chromium and start it with the pipeline's launch flags.
///
/// `user_data_dir` becomes the profile of this process; it is removed again if
/// the launch fails. The returned handler task drives the CDP connection and
/// must be aborted once the browser is gone.
pub async fn launch_browser(
    config: &BrowserConfig,
    user_data_dir: PathBuf,
) -> BrowserResult<(Browser, JoinHandle<()>)> {
    let chrome_path = match find_browser_executable(config.chrome_path.as_deref()).await {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}. Falling back to managed download.");
            download_managed_browser().await?
        }
    };

    let temp_guard = TempDirGuard::new(user_data_dir)?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(temp_guard.path.clone())
        .chrome_executable(chrome_path);

    if config.headless {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    config_builder = config_builder.arg(format!("--user-agent={}", config.user_agent));
    for arg in CHROME_ARGS {
        config_builder = config_builder.arg(*arg);
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| BrowserError::LaunchFailed(format!("Failed to build browser config: {e}")))?;

    debug!("Launching browser with config: {:?}", browser_config);
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();

                // Chrome emits CDP events chromiumoxide has no type for; those are noise
                let is_benign_serialization_error = message
                    .contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response");

                if is_benign_serialization_error {
                    trace!("Suppressed benign CDP serialization error: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        debug!("Browser handler task completed");
    });

    temp_guard.into_path();

    Ok((browser, handler_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_env_tokens_expand_or_survive() {
        // SAFETY: test-local variable name, no other test reads it
        unsafe { std::env::set_var("URL_DIGEST_TEST_DIR", "C:\\Tools") };
        assert_eq!(
            expand_windows_env_vars("%URL_DIGEST_TEST_DIR%\\chrome.exe"),
            "C:\\Tools\\chrome.exe"
        );
        assert_eq!(
            expand_windows_env_vars("%URL_DIGEST_MISSING_VAR%\\chrome.exe"),
            "%URL_DIGEST_MISSING_VAR%\\chrome.exe"
        );
        assert_eq!(expand_windows_env_vars("100%%"), "100%");
    }

    #[test]
    fn temp_dir_guard_removes_unclaimed_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("profile");
        {
            let _guard = TempDirGuard::new(path.clone()).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn temp_dir_guard_keeps_claimed_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("profile");
        let kept = TempDirGuard::new(path.clone()).unwrap().into_path();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn explicit_path_wins_when_present() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = find_browser_executable(Some(file.path())).await.unwrap();
        assert_eq!(found, file.path());
    }
}
