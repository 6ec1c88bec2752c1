//! Identifier patterns applied to rendered text and link targets.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CVE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CVE-\d{4}-\d+").expect("valid CVE pattern"));
static CWE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CWE-\d+").expect("valid CWE pattern"));
static REPORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/reports/(\d+)").expect("valid report pattern"));

/// Paths on the platform that are navigation, not listed content.
pub const NAVIGATION_PATHS: &[&str] = &[
    "/hacktivity/",
    "/opportunities/",
    "/directory/",
    "/leaderboard",
    "/users/sign_in",
];

pub fn cve_id(text: &str) -> Option<&str> {
    CVE_PATTERN.find(text).map(|m| m.as_str())
}

pub fn cwe_id(text: &str) -> Option<&str> {
    CWE_PATTERN.find(text).map(|m| m.as_str())
}

/// Numeric id from a `/reports/<id>` link, relative or absolute.
pub fn report_id(href: &str) -> Option<&str> {
    REPORT_PATTERN
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Whether a same-site link points at listed content rather than site chrome.
pub fn is_content_link(href: &str) -> bool {
    !NAVIGATION_PATHS.iter().any(|path| href.contains(path))
}

/// Drop repeated identifiers, keeping first-seen order.
pub fn unique_in_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
