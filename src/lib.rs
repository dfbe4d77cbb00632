//! # cxsec - CXSecurity vulnerability database crawler
//!
//! This crate fetches pages from the CXSecurity vulnerability database and
//! extracts them into canonical, JSON-serializable records. It covers the
//! five document shapes the site serves (listing pages, record detail
//! pages, CVE detail pages, contributor profiles and keyword search
//! results) behind one facade.
//!
//! ## Features
//!
//! - Fault-tolerant page retrieval with bounded retry, custom headers and
//!   optional proxy
//! - Tolerant extraction: malformed documents yield zero-valued records
//!   instead of errors, so template drift never breaks a crawl
//! - Pagination counters recovered from inline script blocks
//! - Canonical records that round-trip through JSON
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use cxsec::crawler::Crawler;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = Crawler::new()?;
//!
//!     // Search for recent XSS advisories
//!     let result = crawler.search("XSS", 1).await?;
//!     for vuln in &result.vulnerabilities {
//!         println!("{} {} ({})", vuln.date, vuln.id, vuln.title);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod api;
pub mod client;
pub mod crawler;
pub mod model;
pub mod parser;

pub use error::{Error, Result};

/// Origin of the site the crawler targets
pub const DEFAULT_ORIGIN: &str = "https://cxsecurity.com";

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::client::ClientConfig;
    pub use crate::crawler::Crawler;
    pub use crate::error::Error;
    pub use crate::error::Result;
}
