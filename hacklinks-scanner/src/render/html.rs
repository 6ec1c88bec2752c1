//! Static HTML backend.
//!
//! Pages are fetched with `reqwest` (or served from an in-memory fixture map)
//! and queried with `scraper`. No JavaScript runs. Elements remember which
//! page load they came from, so touching one after a navigation fails with
//! `ScanError::StaleElement` the way a browser handle would.

use super::{Element, Renderer};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use ego_tree::NodeId;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

const EMPTY_DOCUMENT: &str = "<html><head></head><body></body></html>";
const NON_RENDERED: &[&str] = &["script", "style"];

enum PageSource {
    Http(Client),
    Fixtures(HashMap<String, String>),
}

#[derive(Clone)]
struct LoadedPage {
    url: String,
    html: Arc<str>,
    generation: u64,
}

struct Session {
    source: PageSource,
    current: Mutex<Option<LoadedPage>>,
    generation: AtomicU64,
    closed: AtomicBool,
}

impl Session {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.source {
            PageSource::Http(ref client) => {
                let response = client.get(url).send().await?.error_for_status()?;
                Ok(response.text().await?)
            }
            PageSource::Fixtures(ref pages) => Ok(pages.get(url).cloned().unwrap_or_else(|| {
                debug!("No fixture for {}, serving an empty document", url);
                EMPTY_DOCUMENT.to_string()
            })),
        }
    }

    async fn load(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        let html = self.fetch(url).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut current = self.current.lock().await;
        *current = Some(LoadedPage {
            url: url.to_string(),
            html: Arc::from(html),
            generation,
        });
        Ok(())
    }

    async fn snapshot(&self) -> Result<LoadedPage> {
        self.ensure_open()?;
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| ScanError::Other("No page loaded".to_string()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::Browser("Session already closed".to_string()));
        }
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScanError::Other(format!("Invalid selector '{}': {}", selector, e)))
}

pub struct HtmlRenderer {
    session: Arc<Session>,
    poll_interval: Duration,
}

impl HtmlRenderer {
    /// Fetch pages over HTTP with the given client.
    pub fn new(client: Client) -> Self {
        Self::with_source(PageSource::Http(client))
    }

    /// Fetch pages over HTTP with a client configured like a desktop browser.
    pub fn http(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs / 2))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self::new(client))
    }

    /// Serve pages from memory, keyed by exact URL. Unknown URLs render as an
    /// empty document.
    pub fn from_pages<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pages = pages
            .into_iter()
            .map(|(url, html)| (url.into(), html.into()))
            .collect();
        Self::with_source(PageSource::Fixtures(pages))
    }

    fn with_source(source: PageSource) -> Self {
        Self {
            session: Arc::new(Session {
                source,
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl Renderer for HtmlRenderer {
    type Element = HtmlElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Loading {}", url);
        self.session.load(url).await
    }

    async fn refresh(&self) -> Result<()> {
        let page = self.session.snapshot().await?;
        self.session.load(&page.url).await
    }

    async fn current_url(&self) -> Result<String> {
        match self.session.snapshot().await {
            Ok(page) => Ok(page.url),
            Err(ScanError::Other(_)) => Ok("about:blank".to_string()),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<HtmlElement>> {
        let selector = parse_selector(selector)?;
        let page = self.session.snapshot().await?;

        let ids: Vec<NodeId> = {
            let document = Html::parse_document(&page.html);
            document.select(&selector).map(|e| e.id()).collect()
        };

        Ok(ids
            .into_iter()
            .map(|node| HtmlElement::new(self.session.clone(), page.clone(), node))
            .collect())
    }

    /// Visible text only: `<body>`, minus script and style contents.
    async fn contains_text(&self, needle: &str) -> Result<bool> {
        let page = self.session.snapshot().await?;
        let body = parse_selector("body")?;
        let document = Html::parse_document(&page.html);
        let root = document
            .select(&body)
            .next()
            .unwrap_or_else(|| document.root_element());

        let found = root.descendants().any(|node| {
            let Some(text) = node.value().as_text() else {
                return false;
            };
            let hidden = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| NON_RENDERED.contains(&parent.value().name()));
            !hidden && text.contains(needle)
        });
        Ok(found)
    }

    async fn quit(&mut self) -> Result<()> {
        self.session.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

pub struct HtmlElement {
    session: Arc<Session>,
    page: LoadedPage,
    node: NodeId,
}

impl HtmlElement {
    fn new(session: Arc<Session>, page: LoadedPage, node: NodeId) -> Self {
        Self {
            session,
            page,
            node,
        }
    }

    /// Re-parse the page this element came from and run `f` on the element.
    fn with_element<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T> {
        self.session.ensure_open()?;
        if !self.session.is_current(self.page.generation) {
            return Err(ScanError::StaleElement(format!(
                "element from {} is no longer attached",
                self.page.url
            )));
        }

        let document = Html::parse_document(&self.page.html);
        let element = document
            .tree
            .get(self.node)
            .and_then(ElementRef::wrap)
            .ok_or_else(|| ScanError::StaleElement(self.page.url.clone()))?;
        Ok(f(element))
    }
}

#[async_trait]
impl Element for HtmlElement {
    async fn text(&self) -> Result<String> {
        self.with_element(|el| el.text().collect::<String>())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.with_element(|el| el.value().attr(name).map(str::to_string))
    }

    async fn click(&self) -> Result<()> {
        let href = self.with_element(|el| el.value().attr("href").map(str::to_string))?;
        let Some(href) = href else {
            return Err(ScanError::Other(
                "Clicked element has no link target".to_string(),
            ));
        };

        let target = Url::parse(&self.page.url)?.join(&href)?;
        self.session.load(target.as_str()).await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.with_element(|el| {
            let attrs = el.value();
            attrs.attr("disabled").is_none() && attrs.attr("aria-disabled") != Some("true")
        })
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Self>> {
        let selector = parse_selector(selector)?;
        let ids: Vec<NodeId> =
            self.with_element(|el| el.select(&selector).map(|e| e.id()).collect())?;

        Ok(ids
            .into_iter()
            .map(|node| HtmlElement::new(self.session.clone(), self.page.clone(), node))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const TABLE_PAGE: &str = r#"<html><body>
        <table>
            <tr><td>1</td><td>Found CVE-2023-45678 in product</td></tr>
            <tr><td>only cell</td></tr>
        </table>
        <a id="pagination-next-page" class="btn" href="/page/2">Next</a>
    </body></html>"#;

    #[tokio::test]
    async fn test_find_rows_and_cells() {
        let renderer = HtmlRenderer::from_pages([("https://example.com/page/1", TABLE_PAGE)]);
        renderer.navigate("https://example.com/page/1").await.unwrap();

        let rows = renderer.find_all("tr").await.unwrap();
        assert_eq!(rows.len(), 2);

        let cells = rows[0].find_all("td").await.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(
            cells[1].text().await.unwrap(),
            "Found CVE-2023-45678 in product"
        );
        assert_eq!(rows[1].find_all("td").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_click_follows_relative_link_and_stales_old_elements() {
        let renderer = HtmlRenderer::from_pages([
            ("https://example.com/page/1", TABLE_PAGE),
            ("https://example.com/page/2", "<html><body><p>two</p></body></html>"),
        ]);
        renderer.navigate("https://example.com/page/1").await.unwrap();

        let next = renderer.find("#pagination-next-page").await.unwrap();
        assert!(next.is_enabled().await.unwrap());
        assert_eq!(next.attribute("class").await.unwrap().as_deref(), Some("btn"));

        next.click().await.unwrap();
        assert_eq!(
            renderer.current_url().await.unwrap(),
            "https://example.com/page/2"
        );
        assert!(matches!(
            next.text().await,
            Err(ScanError::StaleElement(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_controls() {
        let html = r#"<html><body>
            <button id="a" disabled>A</button>
            <a id="b" aria-disabled="true">B</a>
            <a id="c">C</a>
        </body></html>"#;
        let renderer = HtmlRenderer::from_pages([("https://example.com/", html)]);
        renderer.navigate("https://example.com/").await.unwrap();

        assert!(!renderer.find("#a").await.unwrap().is_enabled().await.unwrap());
        assert!(!renderer.find("#b").await.unwrap().is_enabled().await.unwrap());
        assert!(renderer.find("#c").await.unwrap().is_enabled().await.unwrap());
        assert!(renderer.find("#c").await.unwrap().click().await.is_err());
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let renderer = HtmlRenderer::from_pages([("https://example.com/", TABLE_PAGE)]);
        renderer.navigate("https://example.com/").await.unwrap();
        assert!(matches!(
            renderer.find("#missing").await,
            Err(ScanError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let renderer = HtmlRenderer::from_pages([("https://example.com/", TABLE_PAGE)]);
        renderer.navigate("https://example.com/").await.unwrap();

        let start = tokio::time::Instant::now();
        let result = renderer.wait_for("#missing", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ScanError::Timeout(_))));
        assert!(start.elapsed() >= Duration::from_secs(5));

        assert!(renderer.wait_for("table", Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_contains_text() {
        let html = "<html><body><div><span>Something went wrong: Error 500</span></div></body></html>";
        let renderer = HtmlRenderer::from_pages([("https://example.com/", html)]);
        renderer.navigate("https://example.com/").await.unwrap();

        assert!(renderer.contains_text("Error").await.unwrap());
        assert!(!renderer.contains_text("Success").await.unwrap());
    }

    #[tokio::test]
    async fn test_contains_text_ignores_head_and_scripts() {
        let html = r#"<html><head><title>Error tracker</title></head><body>
            <script>console.log("Error");</script>
            <style>.Error { color: red; }</style>
            <p>All good</p>
        </body></html>"#;
        let renderer = HtmlRenderer::from_pages([("https://example.com/", html)]);
        renderer.navigate("https://example.com/").await.unwrap();

        assert!(!renderer.contains_text("Error").await.unwrap());
        assert!(renderer.contains_text("All good").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_fixture_is_empty_page() {
        let renderer = HtmlRenderer::from_pages(Vec::<(String, String)>::new());
        renderer.navigate("https://example.com/nowhere").await.unwrap();
        assert!(renderer.find_all("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let mut renderer = HtmlRenderer::from_pages([("https://example.com/", TABLE_PAGE)]);
        renderer.navigate("https://example.com/").await.unwrap();
        renderer.quit().await.unwrap();
        assert!(renderer.find_all("tr").await.is_err());
        assert!(renderer.navigate("https://example.com/").await.is_err());
    }

    #[tokio::test]
    async fn test_http_source_and_refresh() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hacktivity/overview"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(
                        r#"<html><body><a href="/reports/42">r</a></body></html>"#,
                    ),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let renderer = HtmlRenderer::new(Client::new());
        let url = format!("{}/hacktivity/overview", mock_server.uri());
        renderer.navigate(&url).await.unwrap();

        let anchors = renderer.find_all("a[href^='/reports/']").await.unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(
            anchors[0].attribute("href").await.unwrap().as_deref(),
            Some("/reports/42")
        );

        renderer.refresh().await.unwrap();
        assert!(matches!(
            anchors[0].attribute("href").await,
            Err(ScanError::StaleElement(_))
        ));
    }

    #[tokio::test]
    async fn test_http_error_status_fails_navigation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let renderer = HtmlRenderer::new(Client::new());
        let result = renderer
            .navigate(&format!("{}/down", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(ScanError::HttpError(_))));
    }
}
