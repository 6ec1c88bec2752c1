use crate::category::{Category, ExtractionMode, NEXT_PAGE_SELECTOR, PageAdvance};
use crate::config::ScrapeConfig;
use crate::error::{Result, ScanError};
use crate::extract;
use crate::render::{Element, Renderer};
use crate::result::{CollectionReport, PageProgress, StopReason};
use crate::retry::{retry, retry_with_delay};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub type ProgressCallback = Arc<dyn Fn(PageProgress) + Send + Sync>;

const TABLE_SELECTOR: &str = "table";
const ROW_SELECTOR: &str = "tr";
const CELL_SELECTOR: &str = "td";
const REPORT_LINK_SELECTOR: &str = "a[href^='/reports/']";
const BODY_SELECTOR: &str = "body";
const ERROR_TEXT: &str = "Error";

/// Walks a category's pages, one at a time, appending links as it goes.
pub struct Paginator {
    config: ScrapeConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Paginator {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Collect every link of `category`, pushing each page's links onto
    /// `sink` as soon as the page is done.
    ///
    /// Page-level failures never escape: a page that cannot be read yields
    /// nothing. Only failing to open a button-driven category's start page
    /// is returned as an error.
    pub async fn collect<R: Renderer>(
        &self,
        renderer: &R,
        category: Category,
        sink: &mut Vec<String>,
    ) -> Result<CollectionReport> {
        let site = self.config.site_root();
        let pacing = &self.config.pacing;
        info!("[{}] Starting collection from {}", category, site);

        if let Some(start_url) = category.start_url(site) {
            renderer.navigate(&start_url).await?;
            tokio::time::sleep(pacing.page_load).await;
        }

        let mut report = CollectionReport::new(category);
        let mut page_index = 0;

        report.stop_reason = loop {
            if report.pages_visited >= self.config.max_pages {
                warn!(
                    "[{}] Reached maximum page limit of {}, results are truncated",
                    category, self.config.max_pages
                );
                report.truncated = true;
                break StopReason::PageLimit;
            }

            let links = match self.load_page(renderer, category, page_index).await {
                Ok(page_url) => self.extract_page(renderer, category, &page_url).await,
                Err(e) => {
                    warn!("[{}] Failed to load page {}: {}", category, page_index, e);
                    Vec::new()
                }
            };
            report.pages_visited += 1;

            if links.is_empty() && category.stops_on_empty_page() {
                info!("[{}] No more content found on page {}", category, page_index);
                break StopReason::EmptyPage;
            }

            report.links_found += links.len();
            debug!(
                "[{}] Page {}: {} links ({} total)",
                category,
                page_index,
                links.len(),
                report.links_found
            );
            if let Some(ref callback) = self.progress_callback {
                callback(PageProgress {
                    category,
                    page: page_index,
                    page_links: links.len(),
                    total_links: report.links_found,
                });
            }
            sink.extend(links);

            let has_next = match category.advance() {
                PageAdvance::NextButton => self.click_next(renderer, category).await,
                PageAdvance::PageIndex => self.probe_next(renderer, category).await.is_some(),
            };
            page_index += 1;

            tokio::time::sleep(pacing.throttle).await;

            if !has_next {
                break StopReason::LastPage;
            }
        };

        info!(
            "[{}] Finished: {} pages, {} links ({})",
            category, report.pages_visited, report.links_found, report.stop_reason
        );
        Ok(report)
    }

    /// Bring page `index` up and return its URL.
    async fn load_page<R: Renderer>(
        &self,
        renderer: &R,
        category: Category,
        index: usize,
    ) -> Result<String> {
        match category.page_url(self.config.site_root(), index) {
            Some(url) => {
                renderer.navigate(&url).await?;
                tokio::time::sleep(self.config.pacing.page_load).await;
                Ok(url)
            }
            // button-driven: the previous click already rendered it
            None => renderer.current_url().await,
        }
    }

    /// Links found on the current page. Retries transient failures, and
    /// gives up with an empty page on exhaustion or any other error.
    pub async fn extract_page<R: Renderer>(
        &self,
        renderer: &R,
        category: Category,
        page_url: &str,
    ) -> Vec<String> {
        let pacing = &self.config.pacing;

        let outcome = match category.mode() {
            ExtractionMode::TableCell { cell } => {
                retry(&pacing.extraction_retry, ScanError::is_transient, move |_| {
                    self.table_identifiers(renderer, category, cell)
                })
                .await
            }
            ExtractionMode::ReportAnchors => {
                retry(&pacing.extraction_retry, ScanError::is_transient, move |_| {
                    self.report_identifiers(renderer)
                })
                .await
            }
            ExtractionMode::WholePage => {
                // the banner gets the longer pause, after its refresh
                let delay_for = |e: &ScanError| match e {
                    ScanError::ErrorBanner => Some(pacing.banner_retry.delay),
                    e if e.is_transient() => Some(pacing.extraction_retry.delay),
                    _ => None,
                };
                retry_with_delay(pacing.banner_retry.max_attempts, delay_for, move |_| {
                    self.page_has_content(renderer, category)
                })
                .await
                .map(|has_content| {
                    if has_content {
                        vec![page_url.to_string()]
                    } else {
                        Vec::new()
                    }
                })
            }
        };

        match outcome {
            Ok(identifiers) => identifiers
                .iter()
                .map(|id| category.link_for(self.config.site_root(), id))
                .collect(),
            Err(e) if e.is_transient() => {
                warn!("[{}] Giving up on {} after retries: {}", category, page_url, e);
                Vec::new()
            }
            Err(e) => {
                error!("[{}] Error extracting from {}: {}", category, page_url, e);
                Vec::new()
            }
        }
    }

    async fn table_identifiers<R: Renderer>(
        &self,
        renderer: &R,
        category: Category,
        cell: usize,
    ) -> Result<Vec<String>> {
        renderer
            .wait_for(TABLE_SELECTOR, self.config.pacing.content_wait)
            .await?;

        let mut identifiers = Vec::new();
        for row in renderer.find_all(ROW_SELECTOR).await? {
            let text = match cell_text(&row, cell).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) if e.is_transient() || matches!(e, ScanError::NotFound(_)) => {
                    debug!("[{}] Skipping row: {}", category, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(id) = category.match_identifier(&text) {
                identifiers.push(id.to_string());
            }
        }

        Ok(identifiers)
    }

    async fn report_identifiers<R: Renderer>(&self, renderer: &R) -> Result<Vec<String>> {
        renderer
            .wait_for(REPORT_LINK_SELECTOR, self.config.pacing.content_wait)
            .await?;

        let mut identifiers = Vec::new();
        for anchor in renderer.find_all(REPORT_LINK_SELECTOR).await? {
            match anchor.attribute("href").await {
                Ok(Some(href)) => {
                    if let Some(id) = extract::report_id(&href) {
                        identifiers.push(id.to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Skipping report link: {}", e),
            }
        }

        Ok(extract::unique_in_order(identifiers))
    }

    async fn page_has_content<R: Renderer>(&self, renderer: &R, category: Category) -> Result<bool> {
        renderer
            .wait_for(BODY_SELECTOR, self.config.pacing.content_wait)
            .await?;

        let site_links = format!("a[href^='{}/']", self.config.site_root());
        let mut has_content = false;
        for anchor in renderer.find_all(&site_links).await? {
            if let Some(href) = anchor.attribute("href").await?
                && extract::is_content_link(&href)
            {
                has_content = true;
                break;
            }
        }

        if renderer.contains_text(ERROR_TEXT).await? {
            warn!("[{}] Error message found on page, refreshing", category);
            renderer.refresh().await?;
            return Err(ScanError::ErrorBanner);
        }

        Ok(has_content)
    }

    /// The next-page control, if it is present and usable.
    async fn probe_next<R: Renderer>(&self, renderer: &R, category: Category) -> Option<R::Element> {
        let button = match renderer
            .wait_for(NEXT_PAGE_SELECTOR, self.config.pacing.next_wait)
            .await
        {
            Ok(button) => button,
            Err(e) if e.is_absence() => {
                debug!("[{}] No next page control", category);
                return None;
            }
            Err(e) => {
                warn!("[{}] Error checking next page: {}", category, e);
                return None;
            }
        };

        match is_usable(&button).await {
            Ok(true) => Some(button),
            Ok(false) => {
                debug!("[{}] Next page control is disabled", category);
                None
            }
            Err(e) => {
                warn!("[{}] Error checking next page: {}", category, e);
                None
            }
        }
    }

    async fn click_next<R: Renderer>(&self, renderer: &R, category: Category) -> bool {
        let Some(button) = self.probe_next(renderer, category).await else {
            return false;
        };

        match button.click().await {
            Ok(()) => {
                tokio::time::sleep(self.config.pacing.after_click).await;
                true
            }
            Err(e) => {
                warn!("[{}] Error navigating to next page: {}", category, e);
                false
            }
        }
    }
}

async fn cell_text<E: Element>(row: &E, cell: usize) -> Result<Option<String>> {
    let cells = row.find_all(CELL_SELECTOR).await?;
    match cells.get(cell) {
        Some(cell) => Ok(Some(cell.text().await?.trim().to_string())),
        None => Ok(None),
    }
}

async fn is_usable<E: Element>(button: &E) -> Result<bool> {
    let enabled = button.is_enabled().await?;
    let class = button.attribute("class").await?.unwrap_or_default();
    Ok(enabled && !class.contains("disabled"))
}
