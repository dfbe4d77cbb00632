//! Canonical record types produced by the extraction engine
//!
//! Every extractor returns one of the value types in this module. Records are
//! created by a single extraction call and owned by the caller thereafter;
//! nothing in the crate holds on to them. The JSON field names here are the
//! crate's serialization contract.
//!
//! Extraction is tolerant by design: when a field's expected markup is absent
//! from the document, the field is left at its default value rather than
//! producing an error. Callers therefore cannot distinguish "found but empty"
//! from "not found at all".

mod author;
mod cve;
mod search;

pub use author::AuthorProfile;
pub use cve::{AffectedSoftware, CveDetail};
pub use search::{SearchResult, SearchVulnerability};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub(crate) fn is_false(v: &bool) -> bool {
    !v
}

pub(crate) fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// One vulnerability record, as listed on index pages or shown on a detail
/// page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vulnerability {
    /// Record id derived from the URL, e.g. `WLB-2024040015`; empty when the
    /// URL carries no id marker
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Publication date; `None` when the document did not yield one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Record title
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Absolute URL of the detail page
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Site risk label: `High`, `Med.` or `Low`; empty when absent
    #[serde(skip_serializing_if = "String::is_empty")]
    pub risk_level: String,

    /// Free-form labels, deduplicated, first occurrence first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// CVE number when one is attached to the record
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cve: String,

    /// CWE number when one is attached to the record
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cwe: String,

    /// Whether the issue is exploitable remotely
    #[serde(skip_serializing_if = "is_false")]
    pub is_remote: bool,

    /// Whether the issue is exploitable locally
    #[serde(skip_serializing_if = "is_false")]
    pub is_local: bool,

    /// Reporting author's display name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Absolute URL of the author's profile page
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author_url: String,
}

/// An ordered page of vulnerability records plus the pagination counters
/// mined from the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityList {
    /// Records in document order
    pub items: Vec<Vulnerability>,

    /// Page the document claims to be
    pub current_page: u32,

    /// Total page count; 1 when the document did not yield usable counters
    pub total_pages: u32,
}
