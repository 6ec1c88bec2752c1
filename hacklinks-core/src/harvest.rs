use crate::report::{CategorySummary, HarvestSummary, Outcome};
use crate::store::{self, LinkStore, StoreError};
use hacklinks_scanner::render::{ChromeRenderer, HtmlRenderer, Renderer};
use hacklinks_scanner::{BrowserOptions, Category, PageProgress, Paginator, ScanError, ScrapeConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to acquire renderer: {0}")]
    Renderer(#[from] ScanError),
}

/// Which categories a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    One(Category),
}

impl Selection {
    pub fn categories(&self) -> Vec<Category> {
        match self {
            Selection::All => Category::ALL.to_vec(),
            Selection::One(category) => vec![*category],
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }
        s.parse::<Category>().map(Selection::One)
    }
}

/// How pages get rendered.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Headless Chrome over CDP.
    Chrome(BrowserOptions),
    /// Plain HTTP fetches parsed as static HTML.
    Http { user_agent: String, timeout_secs: u64 },
}

/// Options for a harvest run
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub selection: Selection,
    pub output_dir: PathBuf,
    pub backend: Backend,
    pub scrape: ScrapeConfig,
    pub dedup: bool,
    pub show_progress: bool,
}

/// Run one category: collect into `store` until done or until `shutdown`
/// resolves, then save and release the renderer whatever happened.
pub async fn run_category_until<R, F>(
    renderer: &mut R,
    paginator: &Paginator,
    category: Category,
    store: &mut LinkStore,
    shutdown: F,
) -> CategorySummary
where
    R: Renderer,
    F: Future<Output = ()>,
{
    let started = Instant::now();
    info!(
        "[{}] Starting with {} existing links from {}",
        category,
        store.loaded(),
        store.path().display()
    );

    let (mut outcome, report) = {
        let collection = paginator.collect(&*renderer, category, store.links_mut());
        tokio::select! {
            result = collection => match result {
                Ok(report) => (Outcome::Completed, Some(report)),
                Err(e) => {
                    error!("[{}] Error during scraping: {}", category, e);
                    (Outcome::Failed(e.to_string()), None)
                }
            },
            _ = shutdown => {
                warn!("[{}] Scraping interrupted, saving collected links", category);
                (Outcome::Interrupted, None)
            }
        }
    };

    if let Err(e) = store.save() {
        error!("[{}] {}", category, e);
        if outcome == Outcome::Completed {
            outcome = Outcome::Failed(e.to_string());
        }
    }

    if let Err(e) = renderer.quit().await {
        warn!("[{}] Failed to release renderer: {}", category, e);
    }

    let elapsed = started.elapsed();
    info!(
        "[{}] Done in {:.2}s, {} links total ({} new)",
        category,
        elapsed.as_secs_f64(),
        store.len(),
        store.new_links()
    );

    CategorySummary::from_run(category, store, report.as_ref(), elapsed, outcome)
}

/// Run every selected category in order, stopping the batch on Ctrl-C.
pub async fn execute_harvest(options: &HarvestOptions) -> Result<HarvestSummary, HarvestError> {
    match options.backend {
        Backend::Chrome(ref browser) => {
            let poll_interval = options.scrape.pacing.poll_interval;
            harvest_with(
                options,
                || async move {
                    Ok::<_, ScanError>(
                        ChromeRenderer::launch(browser)
                            .await?
                            .with_poll_interval(poll_interval),
                    )
                },
                interrupt_signal(),
            )
            .await
        }
        Backend::Http {
            ref user_agent,
            timeout_secs,
        } => {
            let poll_interval = options.scrape.pacing.poll_interval;
            harvest_with(
                options,
                || async move {
                    Ok::<_, ScanError>(
                        HtmlRenderer::http(user_agent, timeout_secs)?
                            .with_poll_interval(poll_interval),
                    )
                },
                interrupt_signal(),
            )
            .await
        }
    }
}

/// `execute_harvest` with the renderer source and the stop signal supplied
/// by the caller. A fresh renderer is acquired for every category. One
/// `shutdown` covers the whole batch, renderer startup included.
pub async fn harvest_with<R, A, AF, S>(
    options: &HarvestOptions,
    acquire: A,
    shutdown: S,
) -> Result<HarvestSummary, HarvestError>
where
    R: Renderer,
    A: Fn() -> AF,
    AF: Future<Output = Result<R, ScanError>>,
    S: Future<Output = ()>,
{
    let started = Instant::now();
    let mut summary = HarvestSummary::start(options.scrape.site_root());

    store::create_output_directory(&options.output_dir)?;

    // polled again only while it is still pending: the batch ends once it fires
    tokio::pin!(shutdown);

    for category in options.selection.categories() {
        let mut store = match LinkStore::for_category(&options.output_dir, category, options.dedup) {
            Ok(store) => store,
            Err(e) => {
                error!("[{}] {}", category, e);
                summary.push(CategorySummary::failed(
                    category,
                    options.output_dir.join(category.file_name()),
                    e.to_string(),
                ));
                continue;
            }
        };

        let acquired = tokio::select! {
            result = acquire() => Some(result),
            _ = shutdown.as_mut() => None,
        };

        let mut renderer = match acquired {
            Some(Ok(renderer)) => renderer,
            None => {
                warn!("[{}] Interrupted while starting the renderer", category);
                if let Err(e) = store.save() {
                    error!("[{}] {}", category, e);
                }
                summary.push(CategorySummary::from_run(
                    category,
                    &store,
                    None,
                    Duration::ZERO,
                    Outcome::Interrupted,
                ));
                warn!("Interrupted, skipping remaining categories");
                break;
            }
            Some(Err(e)) => {
                let e = HarvestError::from(e);
                error!("[{}] {}", category, e);
                if let Err(save_err) = store.save() {
                    error!("[{}] {}", category, save_err);
                }
                summary.push(CategorySummary::from_run(
                    category,
                    &store,
                    None,
                    Duration::ZERO,
                    Outcome::Failed(e.to_string()),
                ));
                continue;
            }
        };

        let spinner = options.show_progress.then(|| category_spinner(category));
        let mut paginator = Paginator::new(options.scrape.clone());
        if let Some(ref pb) = spinner {
            let pb = pb.clone();
            paginator = paginator.with_progress_callback(Arc::new(move |progress: PageProgress| {
                pb.set_message(format!(
                    "[{}] page {} done, {} links so far",
                    progress.category,
                    progress.page + 1,
                    progress.total_links
                ));
            }));
        }

        let category_summary =
            run_category_until(&mut renderer, &paginator, category, &mut store, shutdown.as_mut())
                .await;

        if let Some(pb) = spinner {
            pb.finish_with_message(format!(
                "[{}] {} ({} links, {} new)",
                category,
                category_summary.outcome,
                category_summary.total,
                category_summary.new_links
            ));
        }

        let interrupted = category_summary.outcome == Outcome::Interrupted;
        summary.push(category_summary);
        if interrupted {
            warn!("Interrupted, skipping remaining categories");
            break;
        }
    }

    summary.finish(started.elapsed());
    Ok(summary)
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn category_spinner(category: Category) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("[{}] starting...", category));
    pb
}
