//! CVE detail-page extractor
//!
//! The CVE pages are table soup: labeled header rows followed by value rows,
//! score widgets as sibling cells, and reference links hidden inside
//! `window.open` onclick attributes. Navigation is therefore a mix of
//! selectors and ancestor/sibling walks from labeled anchor points.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::model::{AffectedSoftware, CveDetail, Vulnerability};

use super::normalize::{absolutize, extract_score, extract_wlb_id, parse_flexible_date};
use super::{Extract, attr_of, element_text};

/// Formats seen in the related-advisories date column
const RELATED_DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%Y.%m.%d"];

static CVE_ID_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1 strong").expect("cve id selector"));
static CENTER_BOLD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("center > b").expect("center bold selector"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));
static TD_H6_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td h6").expect("td h6 selector"));
static BOLD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("b").expect("b selector"));
static CWE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/cwe/']").expect("cwe link selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("tr selector"));
static SCORE_LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.label").expect("score label selector"));
static TD_BOLD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td b").expect("td b selector"));
static STRIPED_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table-striped").expect("striped table selector"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("th selector"));
static BODY_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("tbody row selector"));
static CELL_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td a").expect("cell link selector"));
static ONCLICK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td div[onclick]").expect("onclick selector"));
static CENTER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td > center").expect("center selector"));
static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("link selector"));

static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Published:\s*(\d{4}-\d{2}-\d{2})").expect("published pattern"));
static MODIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Modified:\s*(\d{4}-\d{2}-\d{2})").expect("modified pattern"));
static WINDOW_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.open\('([^']*)'").expect("window.open pattern"));

/// Extractor for CVE detail pages
#[derive(Debug, Clone)]
pub struct CveParser {
    origin: String,
}

impl Default for CveParser {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ORIGIN)
    }
}

impl CveParser {
    /// Create a parser that absolutizes record URLs against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

/// Nearest ancestor element with the given tag name.
fn closest<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|anc| anc.value().name() == name)
}

/// Next sibling element with the given tag name.
fn next_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == name)
}

/// First element matched by `sel` whose collected text contains `needle`.
fn find_containing<'a>(document: &'a Html, sel: &Selector, needle: &str) -> Option<ElementRef<'a>> {
    document
        .select(sel)
        .find(|el| element_text(*el).contains(needle))
}

impl Extract for CveParser {
    type Output = CveDetail;

    fn extract(&self, html: &str) -> Result<CveDetail> {
        if html.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let document = Html::parse_document(html);
        let mut detail = CveDetail::default();

        detail.cve_id = document
            .select(&CVE_ID_SEL)
            .next()
            .map(element_text)
            .unwrap_or_default();

        // Published/Modified sit in bold runs whose surrounding text carries
        // the actual date.
        for bold in document.select(&CENTER_BOLD_SEL) {
            let text = element_text(bold);
            let context = bold
                .parent()
                .and_then(ElementRef::wrap)
                .map(element_text)
                .unwrap_or_default();
            if text.contains("Published:")
                && let Some(caps) = PUBLISHED_RE.captures(&context)
            {
                detail.published = parse_flexible_date(&caps[1], &["%Y-%m-%d"]);
            } else if text.contains("Modified:")
                && let Some(caps) = MODIFIED_RE.captures(&context)
            {
                detail.modified = parse_flexible_date(&caps[1], &["%Y-%m-%d"]);
            }
        }

        if let Some(label_cell) = find_containing(&document, &TD_SEL, "Description:")
            && let Some(label_row) = closest(label_cell, "tr")
            && let Some(value_row) = next_sibling_named(label_row, "tr")
            && let Some(value) = value_row.select(&TD_H6_SEL).next()
        {
            detail.description = element_text(value);
        }

        if let Some(type_label) = find_containing(&document, &BOLD_SEL, "Type:")
            && let Some(parent) = type_label.parent().and_then(ElementRef::wrap)
            && let Some(link) = parent.select(&CWE_LINK_SEL).next()
        {
            detail.cwe_type = element_text(link);
        }

        // Three score widgets side by side in the second row of the CVSS
        // table: base, impact, exploitability.
        if let Some(score_label) = find_containing(&document, &BOLD_SEL, "CVSS Base Score")
            && let Some(table) = closest(score_label, "table")
            && let Some(data_row) = table.select(&TR_SEL).nth(1)
        {
            let cells: Vec<_> = data_row.select(&TD_SEL).collect();
            if cells.len() >= 3 {
                let score_of = |cell: &ElementRef<'_>| {
                    cell.select(&SCORE_LABEL_SEL)
                        .next()
                        .map(|label| extract_score(&element_text(label)))
                        .unwrap_or(0.0)
                };
                detail.cvss_base_score = score_of(&cells[0]);
                detail.cvss_impact_score = score_of(&cells[1]);
                detail.cvss_exploit_score = score_of(&cells[2]);
            }
        }

        // Two header/value row pairs carry the six categorical attributes.
        if let Some(attr_label) = find_containing(&document, &BOLD_SEL, "Exploit range")
            && let Some(table) = closest(attr_label, "table")
        {
            let rows: Vec<_> = table.select(&TR_SEL).collect();
            let mut values = std::collections::HashMap::new();
            for pair in rows.chunks(2) {
                let [header_row, value_row] = pair else {
                    continue;
                };
                let headers: Vec<_> = header_row.select(&TD_BOLD_SEL).map(element_text).collect();
                for (i, value) in value_row.select(&TD_H6_SEL).enumerate() {
                    if let Some(header) = headers.get(i) {
                        values.insert(header.clone(), element_text(value));
                    }
                }
            }
            let mut take = |key: &str| values.remove(key).unwrap_or_default();
            detail.exploit_range = take("Exploit range");
            detail.attack_complexity = take("Attack complexity");
            detail.authentication = take("Authentication");
            detail.confidentiality_impact = take("Confidentiality impact");
            detail.integrity_impact = take("Integrity impact");
            detail.availability_impact = take("Availability impact");
        }

        for table in document.select(&STRIPED_TABLE_SEL) {
            let is_affected = table
                .select(&TH_SEL)
                .any(|th| element_text(th).contains("Affected software"));
            if !is_affected {
                continue;
            }
            for row in table.select(&BODY_ROW_SEL) {
                let links: Vec<_> = row.select(&CELL_LINK_SEL).collect();
                if links.len() < 2 {
                    continue;
                }
                let vendor_name = element_text(links[0]);
                let product_name = element_text(links[1]);
                if vendor_name.is_empty() || product_name.is_empty() {
                    continue;
                }
                detail.affected_software.push(AffectedSoftware {
                    vendor_name,
                    vendor_url: absolutize(&attr_of(links[0], "href"), &self.origin),
                    product_name,
                    product_url: absolutize(&attr_of(links[1], "href"), &self.origin),
                });
            }
        }

        // References open through inline script handlers; only accept links
        // that are already absolute http(s) URLs.
        if let Some(ref_cell) = find_containing(&document, &TD_SEL, "References:")
            && let Some(ref_row) = closest(ref_cell, "tr")
            && let Some(value_row) = next_sibling_named(ref_row, "tr")
        {
            for div in value_row.select(&ONCLICK_SEL) {
                let onclick = attr_of(div, "onclick");
                if let Some(caps) = WINDOW_OPEN_RE.captures(&onclick) {
                    let link = caps[1].trim();
                    if link.starts_with("http") {
                        detail.references.push(link.to_string());
                    }
                }
            }
        }

        if let Some(marker) =
            find_containing(&document, &CENTER_SEL, "See advisories in our WLB2 database")
            && let Some(cell) = closest(marker, "td")
            && let Some(table) = cell.select(&TABLE_SEL).next()
        {
            for row in table.select(&TR_SEL).skip(1) {
                let cells: Vec<_> = row.select(&TD_SEL).collect();
                if cells.len() < 4 {
                    continue;
                }
                let title_link = cells[1].select(&LINK_SEL).next();
                let title = title_link.map(element_text).unwrap_or_default();
                if title.is_empty() {
                    continue;
                }
                let url = title_link
                    .map(|link| absolutize(&attr_of(link, "href"), &self.origin))
                    .unwrap_or_default();
                detail.related_vulnerabilities.push(Vulnerability {
                    id: extract_wlb_id(&url),
                    date: parse_flexible_date(&element_text(cells[3]), RELATED_DATE_FORMATS),
                    title,
                    url,
                    risk_level: cells[0]
                        .select(&SCORE_LABEL_SEL)
                        .next()
                        .map(element_text)
                        .unwrap_or_default(),
                    author: element_text(cells[2]),
                    ..Default::default()
                });
            }
        }

        Ok(detail)
    }
}
