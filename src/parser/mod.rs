//! Extraction engine for the five document shapes the site serves
//!
//! Each parser is an independent struct implementing [`Extract`]; they share
//! the stateless helpers in [`normalize`] and the script miner in
//! [`pagination`] but no state. All of them follow the same tolerant-parsing
//! contract: blank input is the only error; malformed-but-non-empty input
//! yields a zero-valued record, because the documents are uncontrolled,
//! externally-sourced HTML whose templates drift between revisions.

mod author;
mod cve;
mod detail;
mod list;
pub mod normalize;
pub mod pagination;

pub(crate) mod countries;

pub use author::AuthorParser;
pub use cve::CveParser;
pub use detail::DetailParser;
pub use list::ListParser;

use scraper::ElementRef;

use crate::error::Result;

/// Capability interface shared by the extractors: raw document text in,
/// canonical record out.
///
/// Implementations return [`Error::EmptyInput`](crate::Error::EmptyInput)
/// for blank/whitespace input and a zero-valued record for anything else
/// that fails to match the expected structure.
pub trait Extract {
    /// Record type this extractor produces
    type Output;

    /// Parse raw document text into a canonical record.
    fn extract(&self, html: &str) -> Result<Self::Output>;
}

/// Collected element text with whitespace collapsed to single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize::normalize_ws(&el.text().collect::<String>())
}

/// Attribute value as an owned string, empty when absent.
pub(crate) fn attr_of(el: ElementRef<'_>, name: &str) -> String {
    el.value().attr(name).unwrap_or_default().to_string()
}
