//! Keyword search result records

use serde::{Deserialize, Serialize};

/// Result of one keyword search request
///
/// `keyword`, `sort_order` and `per_page` echo the request parameters after
/// validation; the rest comes from the fetched result page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    /// Search keyword as requested
    pub keyword: String,

    pub current_page: u32,

    pub total_pages: u32,

    /// `ASC` or `DESC`
    pub sort_order: String,

    /// Records per page; 10 or 30
    pub per_page: u32,

    /// Matching records in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<SearchVulnerability>,
}

/// One record of a search result page; a narrower shape than
/// [`Vulnerability`](super::Vulnerability) with the date pre-formatted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchVulnerability {
    /// Record id, e.g. `WLB-2024040015`; `unknown` when underivable
    pub id: String,

    pub title: String,

    pub url: String,

    /// Publication date as `YYYY-MM-DD`; `unknown` when absent
    pub date: String,

    pub risk_level: String,

    pub author: String,

    pub author_url: String,
}
