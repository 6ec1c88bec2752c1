//! The four link categories and everything that differs between them.

use crate::extract;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element id of the hacktivity pagination "next" control.
pub const NEXT_PAGE_SELECTOR: &str = "#pagination-next-page";

const OVERVIEW_QUERY: &str =
    "sortField=latest_disclosable_activity_at&sortDirection=DESC&pageIndex=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cve,
    Cwe,
    DisclosedReports,
    UndisclosedReports,
}

/// How the driver reaches the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAdvance {
    /// Click the in-page next control.
    NextButton,
    /// Navigate straight to a `pageIndex=<n>` URL.
    PageIndex,
}

/// What one page yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Match the category's pattern against cell `cell` of every table row.
    TableCell { cell: usize },
    /// Pull numeric ids out of `/reports/<id>` anchors.
    ReportAnchors,
    /// The page URL itself, when the page lists anything.
    WholePage,
}

impl Category {
    /// Fixed order the orchestrator runs categories in.
    pub const ALL: [Category; 4] = [
        Category::Cve,
        Category::Cwe,
        Category::DisclosedReports,
        Category::UndisclosedReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cve => "cve",
            Category::Cwe => "cwe",
            Category::DisclosedReports => "disclosed",
            Category::UndisclosedReports => "undisclosed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Cve => "CVE",
            Category::Cwe => "CWE",
            Category::DisclosedReports => "Disclosed Reports",
            Category::UndisclosedReports => "Undisclosed Reports",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Category::Cve => "cve_links.txt",
            Category::Cwe => "cwe_links.txt",
            Category::DisclosedReports => "disclosed_links.txt",
            Category::UndisclosedReports => "undisclosed_links.txt",
        }
    }

    pub fn advance(&self) -> PageAdvance {
        match self {
            Category::Cve | Category::Cwe => PageAdvance::NextButton,
            Category::DisclosedReports | Category::UndisclosedReports => PageAdvance::PageIndex,
        }
    }

    pub fn mode(&self) -> ExtractionMode {
        match self {
            Category::Cve => ExtractionMode::TableCell { cell: 1 },
            Category::Cwe => ExtractionMode::TableCell { cell: 0 },
            Category::DisclosedReports => ExtractionMode::ReportAnchors,
            Category::UndisclosedReports => ExtractionMode::WholePage,
        }
    }

    /// Identifier in a table cell's text, for table-driven categories.
    pub fn match_identifier<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Category::Cve => extract::cve_id(text),
            Category::Cwe => extract::cwe_id(text),
            _ => None,
        }
    }

    /// Whether a page that yields nothing ends pagination. Button-driven
    /// categories keep going and let the next control decide.
    pub fn stops_on_empty_page(&self) -> bool {
        self.advance() == PageAdvance::PageIndex
    }

    /// Entry URL for button-driven categories, `None` for page-indexed ones.
    pub fn start_url(&self, site: &str) -> Option<String> {
        match self {
            Category::Cve => Some(format!("{}/hacktivity/cve_discovery", site)),
            Category::Cwe => Some(format!("{}/hacktivity/cwe_discovery", site)),
            _ => None,
        }
    }

    /// URL of page `index` for page-indexed categories.
    pub fn page_url(&self, site: &str, index: usize) -> Option<String> {
        let disclosed = match self {
            Category::DisclosedReports => "true",
            Category::UndisclosedReports => "false",
            _ => return None,
        };
        Some(format!(
            "{}/hacktivity/overview?queryString=disclosed%3A{}&{}{}",
            site, disclosed, OVERVIEW_QUERY, index
        ))
    }

    /// Fully qualified link for an extracted identifier.
    pub fn link_for(&self, site: &str, identifier: &str) -> String {
        match self {
            Category::Cve => format!("{}/hacktivity/cve_discovery?id={}", site, identifier),
            Category::Cwe => format!(
                "{}/hacktivity/cwe_discovery?id={}",
                site,
                identifier.to_lowercase()
            ),
            Category::DisclosedReports => format!("{}/reports/{}", site, identifier),
            // the identifier already is the page URL
            Category::UndisclosedReports => identifier.to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cve" => Ok(Category::Cve),
            "cwe" => Ok(Category::Cwe),
            "disclosed" => Ok(Category::DisclosedReports),
            "undisclosed" => Ok(Category::UndisclosedReports),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://hackerone.com";

    #[test]
    fn test_cve_link() {
        assert_eq!(
            Category::Cve.link_for(SITE, "CVE-2023-45678"),
            "https://hackerone.com/hacktivity/cve_discovery?id=CVE-2023-45678"
        );
    }

    #[test]
    fn test_cwe_link_is_lowercased() {
        assert_eq!(
            Category::Cwe.link_for(SITE, "CWE-79"),
            "https://hackerone.com/hacktivity/cwe_discovery?id=cwe-79"
        );
    }

    #[test]
    fn test_report_link() {
        assert_eq!(
            Category::DisclosedReports.link_for(SITE, "555"),
            "https://hackerone.com/reports/555"
        );
    }

    #[test]
    fn test_page_urls() {
        assert_eq!(
            Category::DisclosedReports.page_url(SITE, 3).unwrap(),
            "https://hackerone.com/hacktivity/overview?queryString=disclosed%3Atrue&sortField=latest_disclosable_activity_at&sortDirection=DESC&pageIndex=3"
        );
        assert_eq!(
            Category::UndisclosedReports.page_url(SITE, 0).unwrap(),
            "https://hackerone.com/hacktivity/overview?queryString=disclosed%3Afalse&sortField=latest_disclosable_activity_at&sortDirection=DESC&pageIndex=0"
        );
        assert!(Category::Cve.page_url(SITE, 0).is_none());
        assert!(Category::DisclosedReports.start_url(SITE).is_none());
    }

    #[test]
    fn test_advance_and_termination() {
        assert_eq!(Category::Cve.advance(), PageAdvance::NextButton);
        assert_eq!(Category::Cwe.advance(), PageAdvance::NextButton);
        assert!(!Category::Cve.stops_on_empty_page());
        assert!(Category::DisclosedReports.stops_on_empty_page());
        assert!(Category::UndisclosedReports.stops_on_empty_page());
    }

    #[test]
    fn test_from_str_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("all".parse::<Category>().is_err());
    }

    #[test]
    fn test_file_names() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.file_name()).collect();
        assert_eq!(
            names,
            vec![
                "cve_links.txt",
                "cwe_links.txt",
                "disclosed_links.txt",
                "undisclosed_links.txt"
            ]
        );
    }
}
