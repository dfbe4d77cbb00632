//! Pagination counters mined from inline script blocks
//!
//! The site renders its pager with a client-side framework; the visible
//! markup carries only template variables. The real counters live in inline
//! `<script>` assignments, so they are recovered with regexes over script
//! text instead of selectors over markup.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("script selector"));
static CURRENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$scope\.currentPage\s*=\s*(\d+)").expect("currentPage pattern"));
static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$scope\.totalItems\s*=\s*(\d+)").expect("totalItems pattern"));
static PER_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$scope\.perPage\s*=\s*(\d+)").expect("perPage pattern"));

/// Pagination counters for a list-shaped document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
        }
    }
}

/// Scan all inline script blocks for pagination assignments.
///
/// Any unmatched counter keeps its default (page 1, 10 per page).
/// `total_pages` is computed as `ceil(total_items / per_page)` only when both
/// operands are positive; otherwise it stays 1. Never errors.
pub fn mine_pagination(document: &Html) -> Pagination {
    let mut current_page = 1u32;
    let mut total_items = 0u32;
    let mut per_page = 10u32;

    for script in document.select(&SCRIPT_SEL) {
        let text: String = script.text().collect();
        if let Some(caps) = CURRENT_RE.captures(&text)
            && let Ok(v) = caps[1].parse()
        {
            current_page = v;
        }
        if let Some(caps) = TOTAL_RE.captures(&text)
            && let Ok(v) = caps[1].parse()
        {
            total_items = v;
        }
        if let Some(caps) = PER_PAGE_RE.captures(&text)
            && let Ok(v) = caps[1].parse()
        {
            per_page = v;
        }
    }

    let total_pages = if total_items > 0 && per_page > 0 {
        total_items.div_ceil(per_page)
    } else {
        1
    };

    Pagination {
        current_page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mines_counters_from_script_text() {
        let html = Html::parse_document(
            r#"<html><body>
            <script>
                $scope.currentPage = 85;
                $scope.totalItems = 860;
                $scope.perPage = 60;
            </script>
            </body></html>"#,
        );

        let pagination = mine_pagination(&html);
        assert_eq!(pagination.current_page, 85);
        // ceil(860 / 60) = 15
        assert_eq!(pagination.total_pages, 15);
    }

    #[test]
    fn defaults_when_no_script_matches() {
        let html = Html::parse_document("<html><body><p>no scripts</p></body></html>");
        assert_eq!(mine_pagination(&html), Pagination::default());
    }

    #[test]
    fn missing_per_page_falls_back_to_ten() {
        let html = Html::parse_document(
            "<script>$scope.currentPage = 2; $scope.totalItems = 25;</script>",
        );
        let pagination = mine_pagination(&html);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, 3);
    }

    #[test]
    fn zero_total_items_keeps_single_page() {
        let html = Html::parse_document("<script>$scope.totalItems = 0;</script>");
        assert_eq!(mine_pagination(&html).total_pages, 1);
    }
}
