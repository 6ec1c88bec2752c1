use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use hacklinks_core::harvest::{Backend, HarvestOptions, Selection, execute_harvest};
use hacklinks_core::report::{
    HarvestSummary, generate_json_summary, generate_summary_report, save_report,
};
use hacklinks_scanner::config::{DEFAULT_USER_AGENT, default_request_timeout};
use hacklinks_scanner::render::find_chrome;
use hacklinks_scanner::{BrowserOptions, ScrapeConfig};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use url::Url;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Install the stderr logger, plus an ANSI-free file logger when asked.
/// `RUST_LOG` wins over the verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    if verbose {
        debug!("Verbose logging enabled");
    }
    Ok(())
}

/// Build harvest options from parsed arguments
pub fn build_options(args: &ArgMatches) -> anyhow::Result<HarvestOptions> {
    let selection = args
        .get_one::<String>("type")
        .map(String::as_str)
        .unwrap_or("all")
        .parse::<Selection>()
        .map_err(anyhow::Error::msg)?;

    let output_dir = args
        .get_one::<String>("output-dir")
        .map(|dir| expand_path(dir))
        .unwrap_or_else(|| PathBuf::from("output"));

    let mut scrape = match args.get_one::<Url>("site") {
        Some(site) => ScrapeConfig::new(site.clone()),
        None => ScrapeConfig::default(),
    };
    if let Some(&max_pages) = args.get_one::<u64>("max-pages") {
        let max_pages = usize::try_from(max_pages)
            .with_context(|| format!("--max-pages {} is too large", max_pages))?;
        scrape = scrape.with_max_pages(max_pages);
    }

    let backend = match args.get_one::<String>("backend").map(String::as_str) {
        Some("http") => Backend::Http {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: default_request_timeout(),
        },
        Some("chrome") | None => Backend::Chrome(BrowserOptions {
            headless: !args.get_flag("headful"),
            chrome_path: args
                .get_one::<PathBuf>("chrome-path")
                .map(|p| expand_path(&p.to_string_lossy())),
            remote_url: args.get_one::<String>("remote-browser").cloned(),
            ..BrowserOptions::default()
        }),
        Some(other) => return Err(anyhow!("Unknown backend: {}", other)),
    };

    Ok(HarvestOptions {
        selection,
        output_dir,
        backend,
        scrape,
        dedup: args.get_flag("dedup"),
        show_progress: !args.get_flag("quiet"),
    })
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Make sure a browser is available before any category starts. Fills in
/// the located executable so every launch uses the same one.
pub fn check_browser(backend: &mut Backend) -> anyhow::Result<()> {
    let Backend::Chrome(options) = backend else {
        debug!("HTTP backend selected, no browser needed");
        return Ok(());
    };

    if let Some(ref remote) = options.remote_url {
        debug!("Using remote browser at {}", remote);
        return Ok(());
    }

    let chrome = find_chrome(options.chrome_path.as_deref())
        .context("Chrome/Chromium is required for the chrome backend")?;
    info!("Using browser at {}", chrome.display());
    options.chrome_path = Some(chrome);
    Ok(())
}

pub fn exit_code(summary: &HarvestSummary) -> i32 {
    if summary.interrupted() {
        EXIT_INTERRUPTED
    } else if summary.failed() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Run the harvest described by `args` and return the process exit code.
pub async fn handle_harvest(args: &ArgMatches) -> i32 {
    let quiet = args.get_flag("quiet");

    let mut options = match build_options(args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {:#}", "[✗]".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = check_browser(&mut options.backend) {
        eprintln!("{} {:#}", "[✗]".red().bold(), e);
        eprintln!(
            "    Install Chrome or Chromium, pass --chrome-path, or use --backend http"
        );
        return EXIT_FAILURE;
    }

    if !quiet {
        println!(
            "{} Collecting {} into {}\n",
            "[*]".cyan().bold(),
            describe_selection(options.selection),
            options.output_dir.display()
        );
    }

    let summary = match execute_harvest(&options).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", "[✗]".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    println!("\n{}", generate_summary_report(&summary));

    if summary.interrupted() {
        println!(
            "{}",
            "Scraping interrupted. Partial results have been saved.".yellow()
        );
    }

    if let Some(path) = args.get_one::<PathBuf>("summary-json") {
        if let Err(e) = write_summary_json(&summary, path) {
            eprintln!("{} {:#}", "[✗]".red().bold(), e);
            return EXIT_FAILURE;
        }
        if !quiet {
            println!("Summary written to {}", path.display());
        }
    }

    exit_code(&summary)
}

pub fn write_summary_json(summary: &HarvestSummary, path: &Path) -> anyhow::Result<()> {
    let json = generate_json_summary(summary).context("Failed to serialise summary")?;
    save_report(&json, path).with_context(|| format!("Failed to write {}", path.display()))
}

fn describe_selection(selection: Selection) -> String {
    match selection {
        Selection::All => "all link categories".to_string(),
        Selection::One(category) => format!("{} links", category.label()),
    }
}
