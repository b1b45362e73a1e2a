//! Shared configuration constants for the extraction pipeline
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Desktop Chrome user agent presented by every browsing context
///
/// Pinned to Chrome 120 on Windows 10, a common desktop fingerprint that
/// keeps bot-detection friction low on news and blog hosts.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Viewport width of every browsing context
pub const VIEWPORT_WIDTH: u32 = 1716;

/// Viewport height of every browsing context
pub const VIEWPORT_HEIGHT: u32 = 1055;

/// Launch flags for stable headless execution in containers and small VMs
pub const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
    "--disable-extensions",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-plugins",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Extra request headers sent by every browsing context
pub const CONTEXT_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// Title used when no probe and no article produced one
pub const DEFAULT_TITLE: &str = "Untitled";

/// Content used when neither the article nor the description is usable
pub const FALLBACK_CONTENT: &str =
    "Content extraction failed, but metadata was collected successfully.";

/// Marker appended to content cut down to the summarizer budget
pub const TRUNCATION_MARKER: &str = "...[content truncated]";

/// Body text length above which a page counts as ready for extraction
pub const READY_TEXT_THRESHOLD: usize = 100;
