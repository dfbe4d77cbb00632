//! REST layer over the crawler facade
//!
//! Thin transport glue: every endpoint maps straight onto one facade call
//! and wraps the outcome in a `{success, data, error}` envelope. Requests
//! authenticate with a shared token, passed either as the `X-API-Token`
//! header or a `token` query parameter; when no token is configured one is
//! generated and printed at startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crawler::Crawler;
use crate::error::Result;

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,

    /// Shared API token; a random one is issued when absent
    pub token: Option<String>,

    /// Whether to answer with permissive CORS headers
    pub enable_cors: bool,
}

/// Shared state behind the router
pub struct AppState {
    crawler: Crawler,
    token: String,
    enable_cors: bool,
}

impl AppState {
    /// Create the state backing the router.
    pub fn new(crawler: Crawler, token: impl Into<String>, enable_cors: bool) -> Self {
        Self {
            crawler,
            token: token.into(),
            enable_cors,
        }
    }
}

/// Standard response envelope wrapping every endpoint's payload
#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
    .into_response()
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

fn crawl_outcome<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(e) => {
            warn!(error = %e, "crawl failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Generate a random 32-byte hex token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let header_token = request
        .headers()
        .get("X-API-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let query_token = request.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    });

    match header_token.or(query_token) {
        Some(token) if token == state.token => next.run(request).await,
        _ => fail(StatusCode::UNAUTHORIZED, "invalid API token"),
    }
}

async fn cors_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.enable_cors {
        return next.run(request).await;
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, X-API-Token"),
    );
    response
}

#[derive(Debug, Deserialize)]
struct ExploitParams {
    id: Option<String>,
}

async fn exploit_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExploitParams>,
) -> Response {
    let id = params.id.unwrap_or_default();
    crawl_outcome(state.crawler.exploit(&id).await)
}

async fn exploit_detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    crawl_outcome(state.crawler.exploit(&id).await)
}

async fn cve_detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    crawl_outcome(state.crawler.cve_detail(&id).await)
}

async fn author_profile(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    crawl_outcome(state.crawler.author_profile(&id).await)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    keyword: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
    sort: Option<String>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(keyword) = params.keyword.filter(|k| !k.is_empty()) else {
        return fail(StatusCode::BAD_REQUEST, "keyword parameter is required");
    };
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(10);
    let sort = params.sort.unwrap_or_else(|| "DESC".to_string());
    crawl_outcome(
        state
            .crawler
            .search_advanced(&keyword, page, per_page, &sort)
            .await,
    )
}

/// Build the axum router (useful for testing).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/exploit", get(exploit_list))
        .route("/api/exploit/:id", get(exploit_detail))
        .route("/api/cve/:id", get(cve_detail))
        .route("/api/author/:id", get(author_profile))
        .route("/api/search", get(search))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors_middleware,
        ))
        .with_state(state)
}

/// Start the API server and block until the process is interrupted.
pub async fn serve(config: ApiConfig, crawler: Crawler) -> Result<()> {
    let token = config.token.clone().unwrap_or_else(generate_token);
    info!(addr = %config.listen_addr, "starting API server");
    // The token is the only credential; make sure the operator sees it.
    println!("API token: {token}");

    let state = Arc::new(AppState::new(crawler, token, config.enable_cors));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use std::time::Duration;

    async fn spawn_api(site_url: &str, enable_cors: bool) -> SocketAddr {
        let config = ClientConfig::builder()
            .base_url(site_url)
            .retry(0, Duration::from_millis(1))
            .build();
        let state = Arc::new(AppState::new(
            Crawler::with_config(config).unwrap(),
            "secret",
            enable_cors,
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn requests_without_a_token_are_rejected() {
        let addr = spawn_api("http://127.0.0.1:1", false).await;

        let response = reqwest::get(format!("http://{addr}/api/exploit"))
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("token"));
    }

    #[tokio::test]
    async fn token_query_parameter_authenticates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/exploit/1")
            .with_body("<table class=\"table-striped\"></table>")
            .create_async()
            .await;

        let addr = spawn_api(&server.url(), false).await;
        let response = reqwest::get(format!("http://{addr}/api/exploit?token=secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert!(body["data"].is_object());
    }

    #[tokio::test]
    async fn search_requires_a_keyword() {
        let addr = spawn_api("http://127.0.0.1:1", false).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{addr}/api/search"))
            .header("X-API-Token", "secret")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn cors_headers_appear_when_enabled() {
        let addr = spawn_api("http://127.0.0.1:1", true).await;

        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{addr}/api/exploit"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[test]
    fn generated_tokens_are_long_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
