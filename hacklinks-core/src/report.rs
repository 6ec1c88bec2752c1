// Run summaries for the terminal and for --summary-json

use crate::store::{LinkStore, count_lines};
use chrono::{DateTime, Utc};
use colored::Colorize;
use hacklinks_scanner::{Category, CollectionReport, StopReason};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a category run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Interrupted,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => f.write_str("completed"),
            Outcome::Interrupted => f.write_str("interrupted"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub file: PathBuf,
    /// Links read from the file before the run.
    pub loaded: usize,
    pub new_links: usize,
    /// Lines in the file after the run.
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_visited: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub truncated: bool,
    pub elapsed_secs: f64,
    pub outcome: Outcome,
}

impl CategorySummary {
    pub fn from_run(
        category: Category,
        store: &LinkStore,
        report: Option<&CollectionReport>,
        elapsed: Duration,
        outcome: Outcome,
    ) -> Self {
        Self {
            category,
            file: store.path().to_path_buf(),
            loaded: store.loaded(),
            new_links: store.new_links(),
            total: count_lines(store.path()),
            pages_visited: report.map(|r| r.pages_visited),
            stop_reason: report.map(|r| r.stop_reason),
            truncated: report.is_some_and(|r| r.truncated),
            elapsed_secs: elapsed.as_secs_f64(),
            outcome,
        }
    }

    /// A category that never got as far as loading its links.
    pub fn failed(category: Category, file: PathBuf, reason: String) -> Self {
        Self {
            category,
            total: count_lines(&file),
            file,
            loaded: 0,
            new_links: 0,
            pages_visited: None,
            stop_reason: None,
            truncated: false,
            elapsed_secs: 0.0,
            outcome: Outcome::Failed(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestSummary {
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub categories: Vec<CategorySummary>,
}

impl HarvestSummary {
    pub fn start(site: &str) -> Self {
        Self {
            site: site.to_string(),
            started_at: Utc::now(),
            elapsed_secs: 0.0,
            categories: Vec::new(),
        }
    }

    pub fn push(&mut self, category: CategorySummary) {
        self.categories.push(category);
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_secs = elapsed.as_secs_f64();
    }

    pub fn total_links(&self) -> usize {
        self.categories.iter().map(|c| c.total).sum()
    }

    pub fn new_links(&self) -> usize {
        self.categories.iter().map(|c| c.new_links).sum()
    }

    pub fn interrupted(&self) -> bool {
        self.categories
            .iter()
            .any(|c| c.outcome == Outcome::Interrupted)
    }

    pub fn failed(&self) -> bool {
        self.categories
            .iter()
            .any(|c| matches!(c.outcome, Outcome::Failed(_)))
    }
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Human-readable summary of a harvest run.
pub fn generate_summary_report(summary: &HarvestSummary) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str(&format!("{}\n", "# Scraping Summary".bold()));
    report.push_str(&format!("  Site: {}\n", summary.site));
    report.push_str(&format!(
        "  Started: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!(
        "  Total execution time: {:.2} seconds\n\n",
        summary.elapsed_secs
    ));

    for category in &summary.categories {
        report.push_str(&format!("## {} Links\n", category.category.label()));
        report.push_str(&format!("  File: {}\n", category.file.display()));

        let status = match category.outcome {
            Outcome::Completed => category.outcome.to_string().green(),
            Outcome::Interrupted => category.outcome.to_string().yellow(),
            Outcome::Failed(_) => category.outcome.to_string().red(),
        };
        report.push_str(&format!("  Status: {}\n", status));
        report.push_str(&format!(
            "  Loaded: {}  New: {}  Total: {}\n",
            category.loaded, category.new_links, category.total
        ));

        if let (Some(pages), Some(stop)) = (category.pages_visited, category.stop_reason) {
            report.push_str(&format!("  Pages visited: {} ({})\n", pages, stop));
        }
        if category.truncated {
            report.push_str(&format!(
                "  {}\n",
                "[!] Stopped at the page limit, more pages remain".yellow()
            ));
        }
        report.push_str(&format!("  Time: {:.2} seconds\n\n", category.elapsed_secs));
    }

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!(
        "  Total Links: {} ({} new)\n",
        summary.total_links(),
        summary.new_links()
    ));

    report
}

pub fn generate_json_summary(summary: &HarvestSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
