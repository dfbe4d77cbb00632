//! Single-record detail-page extractor
//!
//! Detail pages carry their attributes in a column of small `well` boxes,
//! each holding a `Label:` prefix and a value. CSS alone cannot select "the
//! well whose text says Risk:", so the extractor walks all wells and matches
//! on collected text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::model::Vulnerability;

use super::normalize::{absolutize, dedup_preserve_order, parse_flexible_date};
use super::{Extract, attr_of, element_text};

/// Formats tried against date candidates, most likely first
const DETAIL_DATE_FORMATS: &[&str] = &["%Y.%m.%d", "%Y-%m-%d", "%d.%m.%Y", "%b %d, %Y", "%B %d, %Y"];

/// Labels with dedicated fields; wells carrying these never become tags
const KNOWN_LABELS: &[&str] = &["CVE:", "CWE:", "Local:", "Remote:", "Risk:", "Credit:"];

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h4 > b").expect("title selector"));
static TITLE_FALLBACK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".panel-body h4 b").expect("title fallback selector"));
static WELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".well-sm").expect("well selector"));
static RISK_LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.label").expect("risk label selector"));
static CVE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='cveshow']").expect("cve link selector"));
static CWE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='cwe']").expect("cwe link selector"));
static BOLD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("b").expect("b selector"));
static DATE_CANDIDATE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".panel-body .row .col-xs-12.col-md-3 .well-sm b").expect("date selector")
});
static AUTHOR_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='author']").expect("author link selector"));
static ANY_LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("label, span.label").expect("label selector"));

static CVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CVE-\d{4}-\d+").expect("CVE pattern"));
static CWE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CWE-\d+").expect("CWE pattern"));

/// Extractor for single-record detail pages
#[derive(Debug, Clone)]
pub struct DetailParser {
    origin: String,
}

impl Default for DetailParser {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ORIGIN)
    }
}

impl DetailParser {
    /// Create a parser that absolutizes record URLs against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

/// First well box whose collected text contains `label`.
fn well_with_label<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    document
        .select(&WELL_SEL)
        .find(|well| element_text(*well).contains(label))
}

/// True when the well's bold value reads exactly `Yes`.
///
/// Anything else (a `No`, an absent well, decorative markup) leaves the flag
/// unset.
fn bool_well(document: &Html, label: &str) -> bool {
    well_with_label(document, label)
        .map(|well| well.select(&BOLD_SEL).any(|b| element_text(b) == "Yes"))
        .unwrap_or(false)
}

impl Extract for DetailParser {
    type Output = Vulnerability;

    fn extract(&self, html: &str) -> Result<Vulnerability> {
        if html.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let document = Html::parse_document(html);
        let mut vuln = Vulnerability::default();

        vuln.title = document
            .select(&TITLE_SEL)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if vuln.title.is_empty() {
            vuln.title = document
                .select(&TITLE_FALLBACK_SEL)
                .next()
                .map(element_text)
                .unwrap_or_default();
        }

        if let Some(risk_well) = well_with_label(&document, "Risk:")
            && let Some(label) = risk_well.select(&RISK_LABEL_SEL).next()
        {
            vuln.risk_level = element_text(label);
        }

        if let Some(cve_well) = well_with_label(&document, "CVE:")
            && let Some(link) = cve_well.select(&CVE_LINK_SEL).next()
        {
            let text = element_text(link);
            if !text.is_empty() {
                // Keep the raw text when it does not look like a CVE number.
                vuln.cve = CVE_RE
                    .find(&text)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or(text);
            }
        }

        if let Some(cwe_well) = well_with_label(&document, "CWE:")
            && let Some(link) = cwe_well.select(&CWE_LINK_SEL).next()
        {
            let text = element_text(link);
            if !text.is_empty() {
                vuln.cwe = CWE_RE
                    .find(&text)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or(text);
            }
        }

        vuln.is_local = bool_well(&document, "Local:");
        vuln.is_remote = bool_well(&document, "Remote:");

        // The date lives in one of several attribute wells with no label of
        // its own; try every candidate against the format chain and keep the
        // first that parses.
        vuln.date = document
            .select(&DATE_CANDIDATE_SEL)
            .find_map(|b| parse_flexible_date(&element_text(b), DETAIL_DATE_FORMATS));

        if let Some(credit_well) = well_with_label(&document, "Credit:")
            && let Some(link) = credit_well.select(&AUTHOR_LINK_SEL).next()
        {
            vuln.author = element_text(link);
            vuln.author_url = absolutize(&attr_of(link, "href"), &self.origin);
        }

        // Every other labeled well is a free-form tag: vulnerability class,
        // platform, and whatever else the template of the day carries.
        let mut tags = Vec::new();
        for well in document.select(&WELL_SEL) {
            let well_text = element_text(well);
            if KNOWN_LABELS.iter().any(|label| well_text.contains(label)) {
                continue;
            }
            let label_text = well
                .select(&ANY_LABEL_SEL)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" ");
            let label_text = label_text.trim();
            if !label_text.is_empty() && label_text != "N/A" && !label_text.contains(':') {
                tags.push(label_text.to_string());
            }
        }
        vuln.tags = dedup_preserve_order(tags);

        Ok(vuln)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parser() -> DetailParser {
        DetailParser::default()
    }

    const DETAIL_PAGE: &str = r#"
        <html><body><div class="panel-body">
        <h4><b>Example Camera Remote Code Execution</b></h4>
        <div class="row">
          <div class="col-xs-12 col-md-3">
            <div class="well-sm"><b>2023.06.15</b></div>
            <div class="well-sm">Risk: <span class="label">High</span></div>
            <div class="well-sm">CVE: <a href="/cveshow/CVE-2023-1234/">CVE-2023-1234</a></div>
            <div class="well-sm">CWE: <a href="/cwe/787">CWE-787</a></div>
            <div class="well-sm">Local: <b>No</b></div>
            <div class="well-sm">Remote: <b>Yes</b></div>
            <div class="well-sm">Credit: <a href="/author/rgod/1/">rgod</a></div>
            <div class="well-sm"><span class="label">Overflow</span></div>
            <div class="well-sm"><span class="label">Overflow</span></div>
          </div>
        </div>
        </div></body></html>"#;

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parser().extract("  "), Err(Error::EmptyInput)));
    }

    #[test]
    fn malformed_input_yields_zero_record() {
        let vuln = parser().extract("<invalid>html</content>").unwrap();
        assert_eq!(vuln, Vulnerability::default());
    }

    #[test]
    fn parses_detail_page() {
        let vuln = parser().extract(DETAIL_PAGE).unwrap();
        assert_eq!(vuln.title, "Example Camera Remote Code Execution");
        assert_eq!(vuln.risk_level, "High");
        assert_eq!(vuln.cve, "CVE-2023-1234");
        assert_eq!(vuln.cwe, "CWE-787");
        assert!(!vuln.is_local);
        assert!(vuln.is_remote);
        assert_eq!(vuln.date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert_eq!(vuln.author, "rgod");
        assert_eq!(vuln.author_url, "https://cxsecurity.com/author/rgod/1/");
        assert_eq!(vuln.tags, vec!["Overflow"]);
    }

    #[test]
    fn title_falls_back_to_panel_heading() {
        let html = r#"
            <div class="panel-body"><h4><span><b>Fallback Title</b></span></h4></div>"#;
        let vuln = parser().extract(html).unwrap();
        assert_eq!(vuln.title, "Fallback Title");
    }

    #[test]
    fn remote_flag_requires_literal_yes() {
        let html = r#"
            <div class="well-sm">Remote: <b>Maybe</b></div>
            <div class="well-sm">Local: <b>Yes</b></div>"#;
        let vuln = parser().extract(html).unwrap();
        assert!(!vuln.is_remote);
        assert!(vuln.is_local);
    }

    #[test]
    fn keeps_raw_text_when_cve_number_does_not_match() {
        let html = r#"
            <div class="well-sm">CVE: <a href="/cveshow/unknown/">pending assignment</a></div>"#;
        let vuln = parser().extract(html).unwrap();
        assert_eq!(vuln.cve, "pending assignment");
    }
}
