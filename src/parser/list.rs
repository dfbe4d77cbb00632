//! List-page extractor
//!
//! Listing pages come in two layouts. The standard form groups rows under
//! `thead` date headers: a header row sets the running date, and every
//! following item row inherits it until the next header. Search result pages
//! use a flat table instead, with a date cell on every row. The extractor
//! probes for date headers to decide which layout it is looking at.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Vulnerability, VulnerabilityList};

use super::normalize::{absolutize, dedup_preserve_order, extract_wlb_id, parse_flexible_date};
use super::pagination::mine_pagination;
use super::{Extract, attr_of, element_text};

/// Date formats seen in group headers, most common first
const HEADER_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%b %d, %Y"];

/// Date formats seen in flat-table date cells
const FLAT_DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%Y.%m.%d"];

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table-striped").expect("table selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead, tbody > tr").expect("row selector"));
static HEADER_DATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr > th font").expect("header date selector"));
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));
static RISK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.label").expect("risk selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.row div.col-md-7 a").expect("title selector"));
static TAG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.row div.col-md-5 span.label").expect("tag selector"));
static AUTHOR_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.row div.col-md-5 a[href*='/author/']").expect("author selector")
});
static ANY_AUTHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/author/']").expect("author link selector"));
static ANY_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

static CVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CVE-\d{4}-\d+").expect("CVE pattern"));
static CWE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CWE-\d+").expect("CWE pattern"));

/// Extractor for vulnerability listing and search result pages
#[derive(Debug, Clone)]
pub struct ListParser {
    origin: String,
}

impl Default for ListParser {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ORIGIN)
    }
}

impl ListParser {
    /// Create a parser that absolutizes record URLs against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    fn parse_standard_row(&self, row: ElementRef<'_>, current_date: Option<NaiveDate>) -> Option<Vulnerability> {
        let cells: Vec<_> = row.select(&CELL_SEL).collect();
        if cells.len() < 2 {
            return None;
        }

        let risk_level = cells[0]
            .select(&RISK_SEL)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let title_link = cells[1].select(&TITLE_SEL).next()?;
        let title = element_text(title_link);
        if title.is_empty() {
            return None;
        }
        let url = absolutize(&attr_of(title_link, "href"), &self.origin);

        let mut vuln = Vulnerability {
            id: extract_wlb_id(&url),
            date: current_date,
            title,
            url,
            risk_level,
            ..Default::default()
        };

        // Labels on the right-hand side are tags, except the author link.
        let mut tags = Vec::new();
        for tag_el in cells[1].select(&TAG_SEL) {
            if tag_el.select(&ANY_AUTHOR_SEL).next().is_some() {
                continue;
            }
            let tag = element_text(tag_el);
            if tag.is_empty() {
                continue;
            }
            // Full CVE/CWE numbers are promoted to dedicated fields; the
            // bare CVE/CWE marker labels stay tags.
            if let Some(m) = CVE_RE.find(&tag) {
                vuln.cve = m.as_str().to_string();
                continue;
            }
            if let Some(m) = CWE_RE.find(&tag) {
                vuln.cwe = m.as_str().to_string();
                continue;
            }
            if tag == "Remote" {
                vuln.is_remote = true;
            }
            if tag == "Local" {
                vuln.is_local = true;
            }
            tags.push(tag);
        }
        vuln.tags = dedup_preserve_order(tags);

        if let Some(author_link) = cells[1].select(&AUTHOR_SEL).next() {
            vuln.author = element_text(author_link);
            vuln.author_url = absolutize(&attr_of(author_link, "href"), &self.origin);
        }

        Some(vuln)
    }

    fn parse_flat_row(&self, row: ElementRef<'_>) -> Option<Vulnerability> {
        let cells: Vec<_> = row.select(&CELL_SEL).collect();
        if cells.len() < 4 {
            return None;
        }

        let risk_level = cells[0]
            .select(&RISK_SEL)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let title_link = cells[1].select(&ANY_LINK_SEL).next()?;
        let title = element_text(title_link);
        if title.is_empty() {
            return None;
        }
        let url = absolutize(&attr_of(title_link, "href"), &self.origin);

        let (author, author_url) = match cells[2].select(&ANY_AUTHOR_SEL).next() {
            Some(link) => (
                element_text(link),
                absolutize(&attr_of(link, "href"), &self.origin),
            ),
            None => (element_text(cells[2]), String::new()),
        };

        Some(Vulnerability {
            id: extract_wlb_id(&url),
            date: parse_flexible_date(&element_text(cells[3]), FLAT_DATE_FORMATS),
            title,
            url,
            risk_level,
            author,
            author_url,
            ..Default::default()
        })
    }
}

impl Extract for ListParser {
    type Output = VulnerabilityList;

    fn extract(&self, html: &str) -> Result<VulnerabilityList> {
        if html.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let document = Html::parse_document(html);
        let mut items = Vec::new();

        if let Some(table) = document.select(&TABLE_SEL).next() {
            // Probe the layout: date headers mean the standard grouped form.
            let grouped = table.select(&HEADER_DATE_SEL).next().is_some();

            if grouped {
                let mut current_date: Option<NaiveDate> = None;
                for element in table.select(&ROW_SEL) {
                    if element.value().name() == "thead" {
                        if let Some(font) = element.select(&HEADER_DATE_SEL).next() {
                            let header = element_text(font);
                            if let Some(date) = parse_flexible_date(&header, HEADER_DATE_FORMATS) {
                                current_date = Some(date);
                            }
                        }
                        continue;
                    }
                    if let Some(vuln) = self.parse_standard_row(element, current_date) {
                        items.push(vuln);
                    }
                }
            } else {
                for element in table.select(&ROW_SEL) {
                    if element.value().name() == "thead" {
                        continue;
                    }
                    if let Some(vuln) = self.parse_flat_row(element) {
                        items.push(vuln);
                    }
                }
            }
        } else {
            debug!("no result table found in document");
        }

        let pagination = mine_pagination(&document);

        Ok(VulnerabilityList {
            items,
            current_page: pagination.current_page,
            total_pages: pagination.total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ListParser {
        ListParser::default()
    }

    const MINIMAL_LIST: &str = r#"
        <html><body>
        <table class="table-striped">
          <thead><tr><th><font>2023-06-15</font></th></tr></thead>
          <tbody>
            <tr>
              <td><span class="label">High</span></td>
              <td>
                <div class="row">
                  <div class="col-md-7"><a href="/vuln/123">test vuln</a></div>
                  <div class="col-md-5">
                    <span class="label">CVE</span>
                    <span class="label">Remote</span>
                    <span class="label"><a href="/author/alice">alice</a></span>
                  </div>
                </div>
              </td>
            </tr>
          </tbody>
        </table>
        </body></html>"#;

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parser().extract(""), Err(Error::EmptyInput)));
        assert!(matches!(parser().extract("   \n\t"), Err(Error::EmptyInput)));
    }

    #[test]
    fn malformed_input_yields_zero_record() {
        let result = parser().extract("<invalid>html</content>").unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.current_page, 1);
        assert_eq!(result.total_pages, 1);
    }

    #[test]
    fn parses_minimal_grouped_list() {
        let result = parser().extract(MINIMAL_LIST).unwrap();
        assert_eq!(result.items.len(), 1);

        let item = &result.items[0];
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert_eq!(item.title, "test vuln");
        assert_eq!(item.url, "https://cxsecurity.com/vuln/123");
        assert_eq!(item.risk_level, "High");
        assert_eq!(item.tags, vec!["CVE", "Remote"]);
        assert!(item.is_remote);
        assert!(!item.is_local);
        assert_eq!(item.author, "alice");
        assert_eq!(item.author_url, "https://cxsecurity.com/author/alice");
    }

    #[test]
    fn running_date_attaches_to_following_rows() {
        let html = r#"
            <table class="table-striped">
              <thead><tr><th><font>2023-06-15</font></th></tr></thead>
              <tbody><tr>
                <td><span class="label">Low</span></td>
                <td><div class="row">
                  <div class="col-md-7"><a href="/issue/WLB-2023060001">first</a></div>
                  <div class="col-md-5"></div>
                </div></td>
              </tr></tbody>
              <thead><tr><th><font>2023-06-14</font></th></tr></thead>
              <tbody><tr>
                <td><span class="label">Med.</span></td>
                <td><div class="row">
                  <div class="col-md-7"><a href="/issue/WLB-2023060002">second</a></div>
                  <div class="col-md-5"></div>
                </div></td>
              </tr></tbody>
            </table>"#;

        let result = parser().extract(html).unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert_eq!(result.items[1].date, NaiveDate::from_ymd_opt(2023, 6, 14));
        assert_eq!(result.items[0].id, "WLB-2023060001");
    }

    #[test]
    fn promotes_full_cve_and_cwe_numbers_out_of_tags() {
        let html = r#"
            <table class="table-striped">
              <thead><tr><th><font>2024-01-02</font></th></tr></thead>
              <tbody><tr>
                <td><span class="label">High</span></td>
                <td><div class="row">
                  <div class="col-md-7"><a href="/issue/WLB-2024010001">overflow</a></div>
                  <div class="col-md-5">
                    <span class="label">CVE-2024-1234</span>
                    <span class="label">CWE-787</span>
                    <span class="label">Local</span>
                  </div>
                </div></td>
              </tr></tbody>
            </table>"#;

        let item = &parser().extract(html).unwrap().items[0];
        assert_eq!(item.cve, "CVE-2024-1234");
        assert_eq!(item.cwe, "CWE-787");
        assert_eq!(item.tags, vec!["Local"]);
        assert!(item.is_local);
    }

    #[test]
    fn parses_flat_search_table() {
        let html = r#"
            <table class="table-striped">
              <tbody>
                <tr>
                  <td><span class="label">Med.</span></td>
                  <td><a href="/issue/WLB-2024020001">flat result</a></td>
                  <td><a href="/author/bob/1/">bob</a></td>
                  <td>01.02.2024</td>
                </tr>
              </tbody>
            </table>"#;

        let result = parser().extract(html).unwrap();
        assert_eq!(result.items.len(), 1);

        let item = &result.items[0];
        assert_eq!(item.title, "flat result");
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(item.author, "bob");
        assert_eq!(item.author_url, "https://cxsecurity.com/author/bob/1/");
        assert_eq!(item.id, "WLB-2024020001");
    }

    #[test]
    fn mines_pagination_from_scripts() {
        let html = format!(
            "{MINIMAL_LIST}<script>$scope.currentPage = 85; $scope.totalItems = 860; $scope.perPage = 60;</script>"
        );
        let result = parser().extract(&html).unwrap();
        assert_eq!(result.current_page, 85);
        assert_eq!(result.total_pages, 15);
    }
}
