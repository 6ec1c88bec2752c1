//! Page rendering capability.
//!
//! The pagination driver only talks to a page through [`Renderer`] and
//! [`Element`]. Two backends exist: [`ChromeRenderer`] drives a real browser
//! over CDP, [`HtmlRenderer`] fetches static HTML (or serves fixture pages)
//! and evaluates selectors with `scraper`.

mod chrome;
mod html;

pub use chrome::{ChromeRenderer, find_chrome};
pub use html::{HtmlElement, HtmlRenderer};

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A handle to one element of the currently rendered page.
#[async_trait]
pub trait Element: Send + Sync + Sized {
    /// Text content of the element, untrimmed.
    async fn text(&self) -> Result<String>;

    /// Raw attribute value, `None` when the attribute is absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;

    async fn is_enabled(&self) -> Result<bool>;

    /// Descendants of this element matching a CSS selector.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self>>;
}

/// A single page session.
#[async_trait]
pub trait Renderer: Send + Sync {
    type Element: Element;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn refresh(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// All elements matching a CSS selector, possibly none.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Whether the visible body text (scripts and styles excluded) contains `needle`.
    async fn contains_text(&self, needle: &str) -> Result<bool>;

    /// Release the session. Further calls fail.
    async fn quit(&mut self) -> Result<()>;

    /// How often `wait_for` re-queries the page.
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// First element matching `selector`.
    async fn find(&self, selector: &str) -> Result<Self::Element> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::NotFound(selector.to_string()))
    }

    /// Poll until an element matching `selector` is present, failing with
    /// `ScanError::Timeout` once `timeout` has elapsed.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Self::Element> {
        let start = Instant::now();

        loop {
            match self.find_all(selector).await {
                Ok(found) => {
                    if let Some(element) = found.into_iter().next() {
                        trace!("{} present after {:?}", selector, start.elapsed());
                        return Ok(element);
                    }
                }
                // the DOM may be swapped out under us while it renders
                Err(e) if e.is_transient() => trace!("Polling {}: {}", selector, e),
                Err(e) => return Err(e),
            }

            if start.elapsed() >= timeout {
                return Err(ScanError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }
}
