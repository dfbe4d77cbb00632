//! Contributor-profile extractor
//!
//! Profile pages mix a small identity block (name, flag, report counter,
//! contact lines) with a report table. The identity block has no stable
//! markup; fields are located by label prefix over element text, which
//! survives the template drift better than positional selectors do.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::model::{AuthorProfile, Vulnerability};

use super::countries::country_name;
use super::normalize::{absolutize, extract_wlb_id, parse_flexible_date};
use super::pagination::mine_pagination;
use super::{Extract, attr_of, element_text};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("heading selector"));
static FLAG_IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src*='/flags/']").expect("flag selector"));
static BEST_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/best/']").expect("ranking link selector"));
static COUNTER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h4").expect("counter selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("row selector"));
static RISK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.label").expect("risk selector"));
static ISSUE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/issue/']").expect("issue link selector"));
static CVE_MARK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("font[color='#FF8C00']").expect("cve marker selector"));
static DETAILS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.col-md-3").expect("details selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

static FLAG_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/flags/([A-Za-z]{2})\.").expect("flag code pattern"));
static BEST_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/best/([^/]+)/").expect("ranking code pattern"));
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("count pattern"));
static ROW_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("row date pattern"));

/// Extractor for contributor profile pages
#[derive(Debug, Clone)]
pub struct AuthorParser {
    origin: String,
}

impl Default for AuthorParser {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ORIGIN)
    }
}

impl AuthorParser {
    /// Create a parser that absolutizes record URLs against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

/// Most specific element whose text starts with `label`: the shortest match
/// wins, so an ancestor wrapping the whole block never shadows the actual
/// contact line.
fn labeled_element<'a>(document: &'a Html, label: &str) -> Option<(ElementRef<'a>, String)> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|el| {
            let text = element_text(el);
            text.starts_with(label).then_some((el, text))
        })
        .min_by_key(|(_, text)| text.len())
}

fn labeled_value(document: &Html, label: &str, prefer_link: bool) -> String {
    let Some((el, text)) = labeled_element(document, label) else {
        return String::new();
    };
    if prefer_link
        && let Some(link) = el.select(&LINK_SEL).next()
    {
        let href = attr_of(link, "href");
        if !href.is_empty() {
            return href;
        }
    }
    text[label.len()..].trim().to_string()
}

impl Extract for AuthorParser {
    type Output = AuthorProfile;

    fn extract(&self, html: &str) -> Result<AuthorProfile> {
        if html.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let document = Html::parse_document(html);
        let mut profile = AuthorProfile {
            current_page: 1,
            total_pages: 1,
            ..Default::default()
        };

        if let Some(heading) = document
            .select(&HEADING_SEL)
            .find(|h| element_text(*h).contains("Author:"))
        {
            let name = element_text(heading).replacen("Author:", "", 1);
            profile.name = name.trim().to_string();
            // The profile id the site uses in URLs is the display name.
            profile.id = profile.name.clone();
        }

        // Flag image first, ranking link as the fallback.
        let code = document
            .select(&FLAG_IMG_SEL)
            .next()
            .and_then(|img| {
                FLAG_CODE_RE
                    .captures(&attr_of(img, "src"))
                    .map(|caps| caps[1].to_uppercase())
            })
            .or_else(|| {
                document.select(&BEST_LINK_SEL).next().and_then(|link| {
                    BEST_CODE_RE
                        .captures(&attr_of(link, "href"))
                        .map(|caps| caps[1].to_uppercase())
                })
            });
        if let Some(code) = code {
            profile.country = country_name(&code);
            profile.country_code = code;
        }

        if let Some(counter) = document
            .select(&COUNTER_SEL)
            .find(|h| element_text(*h).contains("Reported research:"))
        {
            let counter_text = element_text(counter);
            if let Some(m) = COUNT_RE.find(&counter_text)
                && let Ok(count) = m.as_str().parse()
            {
                profile.reported_count = count;
            }
        }

        profile.twitter = labeled_value(&document, "Twitter:", true);
        profile.website = labeled_value(&document, "Website:", true);
        profile.zone_h = labeled_value(&document, "Zone-H:", true);
        profile.description = labeled_value(&document, "Description:", false);

        // Report table: deduplicated by derived id, last seen wins, first
        // position kept.
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut vulns: Vec<Vulnerability> = Vec::new();
        for row in document.select(&ROW_SEL) {
            let Some(title_link) = row.select(&ISSUE_LINK_SEL).next() else {
                continue;
            };
            let title = element_text(title_link);
            let url = absolutize(&attr_of(title_link, "href"), &self.origin);
            let id = extract_wlb_id(&url);
            if id.is_empty() || title.is_empty() {
                continue;
            }

            let mut vuln = Vulnerability {
                id: id.clone(),
                title,
                url,
                risk_level: row
                    .select(&RISK_SEL)
                    .next()
                    .map(element_text)
                    .unwrap_or_default(),
                author: profile.name.clone(),
                author_url: format!("{}/author/{}/1/", self.origin, profile.id),
                ..Default::default()
            };

            if row
                .select(&CVE_MARK_SEL)
                .any(|font| element_text(font).contains("CVE assigned"))
            {
                vuln.tags.push("CVE".to_string());
            }

            let details = row
                .select(&DETAILS_SEL)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" ");
            if details.contains("Remote") {
                vuln.is_remote = true;
                vuln.tags.push("Remote".to_string());
            }
            if details.contains("Local") {
                vuln.is_local = true;
                vuln.tags.push("Local".to_string());
            }
            if let Some(m) = ROW_DATE_RE.find(&details) {
                vuln.date = parse_flexible_date(m.as_str(), &["%Y-%m-%d"]);
            }

            match by_id.get(&id) {
                Some(&idx) => vulns[idx] = vuln,
                None => {
                    by_id.insert(id, vulns.len());
                    vulns.push(vuln);
                }
            }
        }
        profile.vulnerabilities = vulns;

        let pagination = mine_pagination(&document);
        profile.current_page = pagination.current_page;
        profile.total_pages = pagination.total_pages;

        Ok(profile)
    }
}
