//! Pipeline facade composing the fetcher with the extraction engine
//!
//! Maps a request shape (record id, CVE number, author id, keyword) to the
//! site path it lives under, fetches the document, and hands it to the right
//! extractor. Persistence and presentation stay with the caller; the only
//! I/O here is the fetch itself.

use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::client::{ClientConfig, HttpClient};
use crate::error::Result;
use crate::model::{
    AuthorProfile, CveDetail, SearchResult, SearchVulnerability, Vulnerability, VulnerabilityList,
};
use crate::parser::normalize::extract_wlb_id;
use crate::parser::{AuthorParser, CveParser, DetailParser, Extract, ListParser};

/// Path of the default listing page
const DEFAULT_LIST_PATH: &str = "/exploit/1";

/// Record-id prefix used in detail-page paths
const ID_PREFIX: &str = "WLB-";

/// Start of the fixed date range embedded in search paths
const SEARCH_EPOCH: &str = "1999.1.1";

/// Outcome of an exploit crawl: a listing page for an empty id, a single
/// record otherwise
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExploitPage {
    List(VulnerabilityList),
    Detail(Box<Vulnerability>),
}

/// Crawler facade over the fetcher and the extractors
#[derive(Debug, Clone)]
pub struct Crawler {
    client: HttpClient,
    list_parser: ListParser,
    detail_parser: DetailParser,
    cve_parser: CveParser,
    author_parser: AuthorParser,
}

impl Crawler {
    /// Create a crawler with the default client configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a crawler with a custom client configuration.
    ///
    /// The configured origin is also what extracted URLs are absolutized
    /// against.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let origin = config.base_url.clone();
        Ok(Self {
            client: HttpClient::new(config)?,
            list_parser: ListParser::new(origin.as_str()),
            detail_parser: DetailParser::new(origin.as_str()),
            cve_parser: CveParser::new(origin.as_str()),
            author_parser: AuthorParser::new(origin.as_str()),
        })
    }

    /// Fetch and parse one listing page by site path.
    #[instrument(skip(self))]
    pub async fn crawl_page(&self, path: &str) -> Result<VulnerabilityList> {
        let html = self.client.fetch(path).await?;
        self.list_parser.extract(&html)
    }

    /// Fetch and parse one record detail page by site path.
    ///
    /// The document itself does not carry its own URL, so it is backfilled
    /// from the request path, and the id is derived from it.
    #[instrument(skip(self))]
    pub async fn vulnerability_detail(&self, path: &str) -> Result<Vulnerability> {
        let path = if !path.is_empty() && !path.starts_with('/') {
            format!("/{path}")
        } else {
            path.to_string()
        };

        let html = self.client.fetch(&path).await?;
        let mut vuln = self.detail_parser.extract(&html)?;

        if vuln.url.is_empty() {
            vuln.url = format!("{}{}", self.client.base_url(), path);
        }
        if vuln.id.is_empty() {
            vuln.id = extract_wlb_id(&vuln.url);
        }

        Ok(vuln)
    }

    /// Crawl the default listing page (empty id) or a single record.
    ///
    /// The id may be given with or without the `WLB-` prefix; it ends up in
    /// the path exactly once, even when the caller pasted it twice.
    pub async fn exploit(&self, id: &str) -> Result<ExploitPage> {
        if id.is_empty() {
            return Ok(ExploitPage::List(self.crawl_page(DEFAULT_LIST_PATH).await?));
        }

        let mut bare = id;
        while let Some(stripped) = bare.strip_prefix(ID_PREFIX) {
            bare = stripped;
        }
        let path = format!("/issue/{ID_PREFIX}{bare}");
        debug!(%path, "resolved exploit path");

        let vuln = self.vulnerability_detail(&path).await?;
        Ok(ExploitPage::Detail(Box::new(vuln)))
    }

    /// Fetch and parse one CVE detail page by CVE number.
    #[instrument(skip(self))]
    pub async fn cve_detail(&self, cve_id: &str) -> Result<CveDetail> {
        let path = format!("/cveshow/{cve_id}/");
        let html = self.client.fetch(&path).await?;
        self.cve_parser.extract(&html)
    }

    /// Fetch and parse one contributor profile, always page 1.
    ///
    /// When the page does not yield an id, the requested one is kept.
    #[instrument(skip(self))]
    pub async fn author_profile(&self, author_id: &str) -> Result<AuthorProfile> {
        let path = format!("/author/{author_id}/1/");
        let html = self.client.fetch(&path).await?;
        let mut profile = self.author_parser.extract(&html)?;
        if profile.id.is_empty() {
            profile.id = author_id.to_string();
        }
        Ok(profile)
    }

    /// Keyword search with the default parameters: 10 per page, newest
    /// first.
    pub async fn search(&self, keyword: &str, page: u32) -> Result<SearchResult> {
        self.search_advanced(keyword, page, 10, "DESC").await
    }

    /// Keyword search with explicit paging and ordering.
    ///
    /// The site only supports 10 or 30 results per page and ASC/DESC
    /// ordering; out-of-range values are silently coerced to the defaults
    /// (10, DESC) rather than rejected.
    #[instrument(skip(self))]
    pub async fn search_advanced(
        &self,
        keyword: &str,
        page: u32,
        per_page: u32,
        sort_order: &str,
    ) -> Result<SearchResult> {
        let per_page = if per_page == 10 || per_page == 30 {
            per_page
        } else {
            10
        };
        let sort_order = if sort_order == "ASC" || sort_order == "DESC" {
            sort_order
        } else {
            "DESC"
        };
        let page = page.max(1);

        // The search path embeds a wide date range ending today.
        let today = Utc::now().date_naive();
        let end_date = format!("{}.{}.{}", today.year(), today.month(), today.day());
        let escaped: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        let path = format!(
            "/search/wlb/{sort_order}/AND/{end_date}.{SEARCH_EPOCH}/{page}/{per_page}/{escaped}/"
        );

        let html = self.client.fetch(&path).await?;
        let list = self.list_parser.extract(&html)?;

        let vulnerabilities = list
            .items
            .into_iter()
            .map(|item| {
                let id = if !item.id.is_empty() {
                    item.id
                } else {
                    let derived = extract_wlb_id(&item.url);
                    if derived.is_empty() {
                        "unknown".to_string()
                    } else {
                        derived
                    }
                };
                let date = item
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                SearchVulnerability {
                    id,
                    title: item.title,
                    url: item.url,
                    date,
                    risk_level: item.risk_level,
                    author: item.author,
                    author_url: item.author_url,
                }
            })
            .collect();

        Ok(SearchResult {
            keyword: keyword.to_string(),
            current_page: list.current_page,
            total_pages: list.total_pages,
            sort_order: sort_order.to_string(),
            per_page,
            vulnerabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn crawler_for(server_url: &str) -> Crawler {
        let config = ClientConfig::builder()
            .base_url(server_url)
            .retry(0, Duration::from_millis(1))
            .build();
        Crawler::with_config(config).unwrap()
    }

    const LIST_BODY: &str = r#"
        <table class="table-striped">
          <thead><tr><th><font>2023-06-15</font></th></tr></thead>
          <tbody><tr>
            <td><span class="label">High</span></td>
            <td><div class="row">
              <div class="col-md-7"><a href="/issue/WLB-2023060001">test vuln</a></div>
              <div class="col-md-5"><span class="label"><a href="/author/alice">alice</a></span></div>
            </div></td>
          </tr></tbody>
        </table>"#;

    const DETAIL_BODY: &str = r#"
        <div class="panel-body">
          <h4><b>Router RCE</b></h4>
          <div class="well-sm">Risk: <span class="label">High</span></div>
        </div>"#;

    #[tokio::test]
    async fn empty_id_crawls_the_default_listing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exploit/1")
            .with_body(LIST_BODY)
            .expect(1)
            .create_async()
            .await;

        let result = crawler_for(&server.url()).exploit("").await.unwrap();
        let ExploitPage::List(list) = result else {
            panic!("expected a listing page");
        };
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].id, "WLB-2023060001");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn id_prefix_is_applied_exactly_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/issue/WLB-2023060001")
            .with_body(DETAIL_BODY)
            .expect(3)
            .create_async()
            .await;

        let crawler = crawler_for(&server.url());
        for id in ["2023060001", "WLB-2023060001", "WLB-WLB-2023060001"] {
            let result = crawler.exploit(id).await.unwrap();
            let ExploitPage::Detail(vuln) = result else {
                panic!("expected a detail record");
            };
            assert_eq!(vuln.title, "Router RCE");
            assert_eq!(
                vuln.url,
                format!("{}/issue/WLB-2023060001", server.url())
            );
            assert_eq!(vuln.id, "WLB-2023060001");
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cve_detail_uses_the_templated_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cveshow/CVE-2023-1234/")
            .with_body("<h1><strong>CVE-2023-1234</strong></h1>")
            .expect(1)
            .create_async()
            .await;

        let detail = crawler_for(&server.url())
            .cve_detail("CVE-2023-1234")
            .await
            .unwrap();
        assert_eq!(detail.cve_id, "CVE-2023-1234");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn author_id_is_kept_when_the_page_yields_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/author/ghost/1/")
            .with_body("<html><body>nothing here</body></html>")
            .create_async()
            .await;

        let profile = crawler_for(&server.url())
            .author_profile("ghost")
            .await
            .unwrap();
        assert_eq!(profile.id, "ghost");
    }

    #[tokio::test]
    async fn search_coerces_out_of_range_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/search/wlb/DESC/AND/[\d.]+\.1999\.1\.1/1/10/xss/$".to_string()),
            )
            .with_body(LIST_BODY)
            .expect(1)
            .create_async()
            .await;

        let result = crawler_for(&server.url())
            .search_advanced("xss", 1, 20, "BAD")
            .await
            .unwrap();

        assert_eq!(result.per_page, 10);
        assert_eq!(result.sort_order, "DESC");
        assert_eq!(result.keyword, "xss");
        assert_eq!(result.vulnerabilities.len(), 1);
        assert_eq!(result.vulnerabilities[0].date, "2023-06-15");
        assert_eq!(result.vulnerabilities[0].id, "WLB-2023060001");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_escapes_the_keyword() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/search/wlb/ASC/AND/[\d.]+\.1999\.1\.1/2/30/sql\+injection/$".to_string()),
            )
            .with_body(LIST_BODY)
            .expect(1)
            .create_async()
            .await;

        let result = crawler_for(&server.url())
            .search_advanced("sql injection", 2, 30, "ASC")
            .await
            .unwrap();
        assert_eq!(result.per_page, 30);
        assert_eq!(result.sort_order, "ASC");

        mock.assert_async().await;
    }
}
