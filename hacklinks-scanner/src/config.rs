//! Scrape and browser configuration.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SITE: &str = "https://hackerone.com";
pub const DEFAULT_MAX_PAGES: usize = 1000;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Every wait and sleep the pagination driver performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Sleep after navigating to a page URL.
    pub page_load: Duration,
    /// Bound on waiting for the page's content selector.
    pub content_wait: Duration,
    /// Bound on waiting for the next-page control.
    pub next_wait: Duration,
    /// Sleep after clicking the next-page control.
    pub after_click: Duration,
    /// Sleep between pages.
    pub throttle: Duration,
    /// Poll interval used by `wait_for`.
    pub poll_interval: Duration,
    /// Retry policy for a single page extraction.
    pub extraction_retry: RetryPolicy,
    /// Retry policy when the page renders an error message.
    pub banner_retry: RetryPolicy,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(3),
            content_wait: Duration::from_secs(10),
            next_wait: Duration::from_secs(5),
            after_click: Duration::from_secs(2),
            throttle: Duration::from_secs(1),
            poll_interval: Duration::from_millis(200),
            extraction_retry: RetryPolicy::new(3, Duration::from_secs(2)),
            banner_retry: RetryPolicy::new(3, Duration::from_secs(3)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Platform base URL, e.g. `https://hackerone.com`.
    pub site: Url,
    /// Upper bound on pages visited per category run.
    pub max_pages: usize,
    pub pacing: Pacing,
}

impl ScrapeConfig {
    pub fn new(site: Url) -> Self {
        Self {
            site,
            max_pages: DEFAULT_MAX_PAGES,
            pacing: Pacing::default(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Site root without a trailing slash, used for string templates.
    pub fn site_root(&self) -> &str {
        self.site.as_str().trim_end_matches('/')
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_SITE).expect("DEFAULT_SITE is a valid URL"))
    }
}

/// Options for launching or attaching to Chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOptions {
    /// Run without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// DevTools endpoint of an already running browser (e.g. "http://localhost:9222").
    #[serde(default)]
    pub remote_url: Option<String>,

    /// CDP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),
}

pub fn default_headless() -> bool {
    true
}

pub fn default_request_timeout() -> u64 {
    30
}

pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

pub fn default_window_size() -> (u32, u32) {
    (1920, 1080)
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            remote_url: None,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            window_size: default_window_size(),
        }
    }
}
