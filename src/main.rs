//! # cxsec CLI
//!
//! Command-line access to the crawler facade: listing pages, record and CVE
//! details, contributor profiles, keyword search, plus an embedded REST
//! server. Results are printed as pretty JSON or written to a file; an
//! optional field filter prunes the output to the keys the caller wants.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cxsec::api::{ApiConfig, serve};
use cxsec::client::ClientConfig;
use cxsec::crawler::Crawler;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Crawler for the CXSecurity vulnerability database",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Proxy URL for outgoing requests
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Retries after a failed request
    #[arg(long, global = true, default_value = "3")]
    retries: u32,

    /// Delay between retries in milliseconds
    #[arg(long, global = true, default_value = "500")]
    retry_delay: u64,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write the JSON result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep only these top-level fields (comma-separated)
    #[arg(long)]
    fields: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a vulnerability listing page
    List {
        /// Listing page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch one record by id (with or without the WLB- prefix)
    Detail {
        /// Record id, e.g. WLB-2024040015
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch one CVE detail page
    Cve {
        /// CVE number, e.g. CVE-2023-1234
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch a contributor profile
    Author {
        /// Author id as it appears in profile URLs
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search records by keyword
    Search {
        /// Keyword; multiple words are allowed
        keyword: String,

        /// Result page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Results per page (10 or 30)
        #[arg(long, default_value = "10")]
        per_page: u32,

        /// Sort order (ASC or DESC)
        #[arg(long, default_value = "DESC")]
        sort: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// API token; a random one is issued when omitted
        #[arg(long)]
        token: Option<String>,

        /// Answer with permissive CORS headers
        #[arg(long)]
        cors: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let crawler = build_crawler(&cli.client)?;

    match cli.command {
        Commands::List { page, output } => {
            let list = crawler
                .crawl_page(&format!("/exploit/{page}"))
                .await
                .context("failed to crawl listing page")?;
            emit(&list, &output)?;
        }
        Commands::Detail { id, output } => {
            let page = crawler
                .exploit(&id)
                .await
                .context("failed to crawl record detail")?;
            emit(&page, &output)?;
        }
        Commands::Cve { id, output } => {
            let detail = crawler
                .cve_detail(&id)
                .await
                .context("failed to crawl CVE detail")?;
            emit(&detail, &output)?;
        }
        Commands::Author { id, output } => {
            let profile = crawler
                .author_profile(&id)
                .await
                .context("failed to crawl author profile")?;
            emit(&profile, &output)?;
        }
        Commands::Search {
            keyword,
            page,
            per_page,
            sort,
            output,
        } => {
            let result = crawler
                .search_advanced(&keyword, page, per_page, &sort)
                .await
                .context("search failed")?;
            emit(&result, &output)?;
        }
        Commands::Serve { port, token, cors } => {
            let config = ApiConfig {
                listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
                token,
                enable_cors: cors,
            };
            serve(config, crawler).await?;
        }
    }

    Ok(())
}

fn build_crawler(args: &ClientArgs) -> anyhow::Result<Crawler> {
    let mut builder = ClientConfig::builder()
        .timeout(Duration::from_secs(args.timeout))
        .retry(args.retries, Duration::from_millis(args.retry_delay));
    if let Some(proxy) = &args.proxy {
        builder = builder.proxy(proxy.clone());
    }
    Ok(Crawler::with_config(builder.build())?)
}

/// Serialize a result, apply the field filter, and print or save it.
fn emit<T: serde::Serialize>(value: &T, output: &OutputArgs) -> anyhow::Result<()> {
    let mut json = serde_json::to_value(value)?;
    if let Some(fields) = &output.fields {
        json = filter_fields(json, fields);
    }
    let rendered = serde_json::to_string_pretty(&json)?;

    match &output.output {
        Some(path) => {
            save_to_file(path, &rendered)?;
            eprintln!("saved to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Keep only the listed top-level keys of a JSON object; non-objects are
/// returned unchanged.
fn filter_fields(value: serde_json::Value, fields: &str) -> serde_json::Value {
    let serde_json::Value::Object(map) = value else {
        return value;
    };
    let keep: Vec<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    serde_json::Value::Object(
        map.into_iter()
            .filter(|(key, _)| keep.contains(&key.as_str()))
            .collect(),
    )
}

fn save_to_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
