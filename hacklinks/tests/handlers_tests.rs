use hacklinks::commands::command_argument_builder;
use hacklinks::handlers::*;
use hacklinks::{Backend, Selection};
use hacklinks_core::report::{CategorySummary, HarvestSummary, Outcome};
use hacklinks_scanner::Category;
use std::fs;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

fn parse(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["hacklinks"];
    argv.extend_from_slice(args);
    command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap()
}

fn summary_with(outcomes: &[Outcome]) -> HarvestSummary {
    let mut summary = HarvestSummary::start("https://hackerone.com");
    for (category, outcome) in Category::ALL.iter().zip(outcomes) {
        let mut entry = CategorySummary::failed(
            *category,
            PathBuf::from("/nonexistent").join(category.file_name()),
            String::new(),
        );
        entry.outcome = outcome.clone();
        summary.push(entry);
    }
    summary
}

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_default_options() {
    let options = build_options(&parse(&[])).unwrap();

    assert_eq!(options.selection, Selection::All);
    assert_eq!(options.output_dir, PathBuf::from("output"));
    assert_eq!(options.scrape.max_pages, 1000);
    assert_eq!(options.scrape.site_root(), "https://hackerone.com");
    assert!(!options.dedup);
    assert!(options.show_progress);

    match options.backend {
        Backend::Chrome(browser) => {
            assert!(browser.headless);
            assert!(browser.chrome_path.is_none());
            assert!(browser.remote_url.is_none());
        }
        Backend::Http { .. } => panic!("chrome is the default backend"),
    }
}

#[test]
fn test_options_from_flags() {
    let options = build_options(&parse(&[
        "--type",
        "disclosed",
        "--backend",
        "http",
        "--max-pages",
        "5",
        "--site",
        "https://h1.test/",
        "--dedup",
        "-q",
        "-o",
        "~/links",
    ]))
    .unwrap();

    assert_eq!(options.selection, Selection::One(Category::DisclosedReports));
    assert_eq!(options.scrape.max_pages, 5);
    assert_eq!(options.scrape.site_root(), "https://h1.test");
    assert!(options.dedup);
    assert!(!options.show_progress);
    assert!(!options.output_dir.to_string_lossy().starts_with('~'));
    assert!(options.output_dir.ends_with("links"));
    assert!(matches!(options.backend, Backend::Http { .. }));
}

#[test]
fn test_headful_remote_browser() {
    let options = build_options(&parse(&[
        "--headful",
        "--remote-browser",
        "http://127.0.0.1:9222",
    ]))
    .unwrap();

    let Backend::Chrome(browser) = options.backend else {
        panic!("expected chrome backend");
    };
    assert!(!browser.headless);
    assert_eq!(browser.remote_url.as_deref(), Some("http://127.0.0.1:9222"));
}

#[test]
fn test_rejects_unknown_type() {
    let result = command_argument_builder().try_get_matches_from(["hacklinks", "--type", "reports"]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_zero_max_pages() {
    let result =
        command_argument_builder().try_get_matches_from(["hacklinks", "--max-pages", "0"]);
    assert!(result.is_err());

    let options = build_options(&parse(&["--max-pages", "1"])).unwrap();
    assert_eq!(options.scrape.max_pages, 1);
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    let result = command_argument_builder().try_get_matches_from(["hacklinks", "-v", "-q"]);
    assert!(result.is_err());
}

#[test]
fn test_chrome_path_conflicts_with_remote_browser() {
    let result = command_argument_builder().try_get_matches_from([
        "hacklinks",
        "--chrome-path",
        "/usr/bin/chromium",
        "--remote-browser",
        "http://127.0.0.1:9222",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// Browser Preflight Tests
// ============================================================================

#[test]
fn test_preflight_skipped_for_http_and_remote() {
    let mut http = Backend::Http {
        user_agent: "test".to_string(),
        timeout_secs: 5,
    };
    assert!(check_browser(&mut http).is_ok());

    let options = build_options(&parse(&["--remote-browser", "http://127.0.0.1:9222"])).unwrap();
    let mut remote = options.backend;
    assert!(check_browser(&mut remote).is_ok());
}

#[test]
fn test_preflight_accepts_explicit_executable() {
    let fake_chrome = NamedTempFile::new().unwrap();
    let path = fake_chrome.path().to_string_lossy().to_string();

    let mut backend = build_options(&parse(&["--chrome-path", &path]))
        .unwrap()
        .backend;
    check_browser(&mut backend).unwrap();

    let Backend::Chrome(browser) = backend else {
        panic!("expected chrome backend");
    };
    assert_eq!(browser.chrome_path.as_deref(), Some(fake_chrome.path()));
}

#[test]
fn test_preflight_fails_for_missing_executable() {
    let mut backend = build_options(&parse(&["--chrome-path", "/definitely/not/chrome"]))
        .unwrap()
        .backend;
    assert!(check_browser(&mut backend).is_err());
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_exit_codes() {
    assert_eq!(
        exit_code(&summary_with(&[Outcome::Completed, Outcome::Completed])),
        EXIT_SUCCESS
    );
    assert_eq!(
        exit_code(&summary_with(&[
            Outcome::Completed,
            Outcome::Failed("boom".to_string())
        ])),
        EXIT_FAILURE
    );
    assert_eq!(
        exit_code(&summary_with(&[
            Outcome::Failed("boom".to_string()),
            Outcome::Interrupted
        ])),
        EXIT_INTERRUPTED
    );
}

#[test]
fn test_write_summary_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("summary.json");

    write_summary_json(&summary_with(&[Outcome::Completed]), &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"category\": \"cve\""));
    assert!(content.contains("\"status\": \"completed\""));
}

#[test]
fn test_write_summary_json_to_missing_directory_fails() {
    let path = PathBuf::from("/definitely/not/here/summary.json");
    assert!(write_summary_json(&summary_with(&[]), &path).is_err());
}
