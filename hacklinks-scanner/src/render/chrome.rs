//! Headless Chrome backend over the DevTools protocol.

use super::{Element, Renderer};
use crate::config::BrowserOptions;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Locate a Chrome/Chromium executable, preferring an explicit path.
pub fn find_chrome(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ScanError::NotFound(format!(
            "Chrome executable {}",
            path.display()
        )));
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(ScanError::NotFound(
        "Chrome/Chromium executable (install chromium or pass --chrome-path)".to_string(),
    ))
}

pub struct ChromeRenderer {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    owns_browser: bool,
    poll_interval: Duration,
}

impl ChromeRenderer {
    /// Launch a local browser, or attach to `options.remote_url` when set,
    /// and open a single blank tab.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let (browser, mut handler, owns_browser) = match options.remote_url {
            Some(ref remote_url) => {
                let (browser, handler) = Self::connect_remote(remote_url).await?;
                (browser, handler, false)
            }
            None => {
                let (browser, handler) = Self::launch_local(options).await?;
                (browser, handler, true)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await?;

        Ok(Self {
            browser: Some(browser),
            page,
            handler,
            owns_browser,
            poll_interval: Duration::from_millis(200),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn launch_local(
        options: &BrowserOptions,
    ) -> Result<(Browser, chromiumoxide::handler::Handler)> {
        let chrome_path = find_chrome(options.chrome_path.as_deref())?;
        info!(
            "Launching {} (headless={})",
            chrome_path.display(),
            options.headless
        );

        let (width, height) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .request_timeout(Duration::from_secs(options.request_timeout));

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-notifications")
            .arg("--disable-extensions")
            .arg("--disable-infobars")
            .arg(format!("--user-agent={}", options.user_agent));

        let config = builder
            .build()
            .map_err(|e| ScanError::Browser(format!("Failed to build browser config: {}", e)))?;

        let launched = Browser::launch(config).await?;
        Ok(launched)
    }

    async fn connect_remote(url: &str) -> Result<(Browser, chromiumoxide::handler::Handler)> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let version: serde_json::Value = reqwest::get(&version_url).await?.json().await?;
        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScanError::Browser(format!("No webSocketDebuggerUrl at {}", version_url))
            })?;

        let connected = Browser::connect(ws_url).await?;
        Ok(connected)
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    type Element = ChromeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.page.reload().await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ChromeElement>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements.into_iter().map(ChromeElement).collect())
    }

    /// Visible text only: `<body>`, minus script and style contents.
    async fn contains_text(&self, needle: &str) -> Result<bool> {
        let needle = serde_json::to_string(needle)
            .map_err(|e| ScanError::Other(format!("Cannot encode search text: {}", e)))?;
        let script = format!(
            r#"(() => {{
                const root = document.body || document.documentElement;
                if (!root) return false;
                const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
                while (walker.nextNode()) {{
                    const node = walker.currentNode;
                    const parent = node.parentNode ? node.parentNode.nodeName : "";
                    if (parent === "SCRIPT" || parent === "STYLE") continue;
                    if (node.nodeValue.includes({needle})) return true;
                }}
                return false;
            }})()"#
        );

        self.page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| ScanError::Browser(format!("Unexpected script result: {}", e)))
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let owns_browser = self.owns_browser;
        let page = self.page.clone();
        let shutdown = async move {
            if owns_browser {
                browser.close().await?;
                browser.wait().await?;
            } else {
                // leave somebody else's browser running, just drop our tab
                page.close().await?;
            }
            Ok::<(), ScanError>(())
        };
        shutdown_then_abort(shutdown, &self.handler).await
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Await `shutdown`, then stop the CDP event loop whether or not it worked.
async fn shutdown_then_abort<F>(shutdown: F, handler: &JoinHandle<()>) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let result = shutdown.await;
    handler.abort();
    result
}

pub struct ChromeElement(chromiumoxide::element::Element);

#[async_trait]
impl Element for ChromeElement {
    async fn text(&self) -> Result<String> {
        Ok(self.0.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.0.attribute(name).await?)
    }

    async fn click(&self) -> Result<()> {
        self.0.click().await?;
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool> {
        if self.0.attribute("disabled").await?.is_some() {
            return Ok(false);
        }
        let aria_disabled = self.0.attribute("aria-disabled").await?;
        Ok(aria_disabled.as_deref() != Some("true"))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Self>> {
        let elements = self.0.find_elements(selector).await?;
        Ok(elements.into_iter().map(ChromeElement).collect())
    }
}
