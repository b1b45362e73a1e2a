//! Page digest pipeline
//!
//! Renders a web page in headless Chromium via chromiumoxide, races metadata
//! probes against a content-readiness signal, isolates the primary article with
//! a readability pass and normalizes it into markdown for summarization.

pub mod browser;
pub mod browser_setup;
mod manager;
pub mod markdown;
pub mod page_extractor;
pub mod pipeline;
pub mod server;
pub mod summarizer;
mod utils;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "URL_DIGEST_CONFIG";

/// Environment variable overriding `server.api_key`
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable, checked before any discovery
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// User agent presented by every browsing context
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Viewport dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Timeouts governing a single extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Hard limit for reaching DOMContentLoaded
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Limit for each metadata probe and for the readiness detector
    #[serde(default = "default_metadata_timeout_ms")]
    pub metadata_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token required by `/url-summary`. Every request is rejected when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// External text-generation process fed with the scrape result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_program_args")]
    pub args: Vec<String>,

    #[serde(default = "default_summarizer_timeout_secs")]
    pub timeout_secs: u64,

    /// Content budget (in characters) embedded into the prompt
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_headless() -> bool {
    true
}

fn default_user_agent() -> String {
    utils::constants::DESKTOP_USER_AGENT.to_string()
}

fn default_window_width() -> u32 {
    utils::constants::VIEWPORT_WIDTH
}

fn default_window_height() -> u32 {
    utils::constants::VIEWPORT_HEIGHT
}

fn default_navigation_timeout_ms() -> u64 {
    15_000
}

fn default_metadata_timeout_ms() -> u64 {
    10_000
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_program() -> String {
    "claude".to_string()
}

fn default_program_args() -> Vec<String> {
    vec!["--model".to_string(), "sonnet".to_string(), "-p".to_string()]
}

fn default_summarizer_timeout_secs() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    8000
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            user_agent: default_user_agent(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            metadata_timeout_ms: default_metadata_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_program_args(),
            timeout_secs: default_summarizer_timeout_secs(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

/// Load config from an explicit path, `$URL_DIGEST_CONFIG`, or `./config.yaml`
///
/// A missing default file yields `Config::default()`; an explicit path that
/// does not exist is an error. `$API_KEY` overrides `server.api_key`.
pub fn load_yaml_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match explicit {
        Some(config_path) => read_config(&config_path)?,
        None => {
            let config_path = PathBuf::from("config.yaml");
            if config_path.exists() {
                read_config(&config_path)?
            } else {
                Config::default()
            }
        }
    };

    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.is_empty()
    {
        config.server.api_key = Some(key);
    }

    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

pub use browser::{
    BrowserEngine, BrowserError, BrowserLauncher, BrowserResult, BrowsingContext,
    ChromeLauncher, ContextProfile, PageHandle,
};
pub use browser_setup::{download_managed_browser, find_browser_executable};
pub use manager::{Session, SessionManager};
pub use markdown::{normalize_markdown, to_markdown};
pub use page_extractor::{
    ExtractedArticle, MetadataRacer, PageMetadata, ProbeValues, Readiness, extract_article,
    extract_metadata,
};
pub use pipeline::{PageScraper, ScrapeRequest, ScrapeResult, Scraper, assemble, scrape_url};
pub use summarizer::{SummarizeError, Summarizer, render_prompt, truncate_content};
pub use utils::ScrapeError;
pub use utils::constants;
