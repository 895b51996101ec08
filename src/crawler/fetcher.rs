//! Page fetch client boundary
//!
//! The orchestrator consumes fetching through the [`PageFetcher`]
//! trait; [`HttpFetcher`] is the crate's reqwest-backed implementation.
//! HTML responses are converted to markdown, other text bodies (plain
//! text, markdown files, sitemap XML) pass through verbatim.

use crate::config::UserAgentConfig;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Result of one fetch against the client
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// Markdown rendition of the content (or the raw body for non-HTML)
    pub markdown: String,
    /// Original HTML body, when the response was HTML
    pub html: Option<String>,
    /// Whether the fetch produced usable content
    pub success: bool,
    /// Failure description when `success` is false
    pub error: Option<String>,
}

impl FetchedPage {
    /// A failed fetch carrying its error message
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markdown: String::new(),
            html: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// External fetch client contract
///
/// Implementations must be safe to call many times concurrently.
/// Failures surface as `Err` (transport problems) or as a page with
/// `success = false` (HTTP-level problems), never as panics.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Builds the HTTP client used by [`HttpFetcher`]
///
/// Timeouts are generous but bounded; compression is negotiated.
/// Redirects are followed by reqwest's default policy; the
/// orchestrator only ever sees the final URL.
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`PageFetcher`]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an externally configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Ok(FetchedPage::failure(
                final_url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await?;

        if content_type.contains("text/html") {
            let markdown = html2md::parse_html(&body);
            Ok(FetchedPage {
                url: final_url,
                markdown,
                html: Some(body),
                success: true,
                error: None,
            })
        } else {
            // Plain text, markdown files, and sitemap XML pass through raw.
            Ok(FetchedPage {
                url: final_url,
                markdown: body,
                html: None,
                success: true,
                error: None,
            })
        }
    }
}
