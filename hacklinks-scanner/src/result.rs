use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a category run stopped paginating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The next-page control was missing, disabled or could not be used.
    LastPage,
    /// A page-indexed category hit a page without content.
    EmptyPage,
    /// The page bound was reached while more pages remained.
    PageLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::LastPage => "last page reached",
            StopReason::EmptyPage => "empty page",
            StopReason::PageLimit => "page limit reached",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub category: Category,
    pub pages_visited: usize,
    pub links_found: usize,
    pub stop_reason: StopReason,
    pub truncated: bool,
}

impl CollectionReport {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            pages_visited: 0,
            links_found: 0,
            stop_reason: StopReason::LastPage,
            truncated: false,
        }
    }
}

/// Progress after each visited page.
#[derive(Debug, Clone)]
pub struct PageProgress {
    pub category: Category,
    pub page: usize,
    pub page_links: usize,
    pub total_links: usize,
}
