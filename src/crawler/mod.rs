//! Crawler module: fetch client boundary and fetch strategies
//!
//! Each strategy performs one fetch pattern against the page fetcher,
//! honoring bounded concurrency, cooperative cancellation checks, and
//! heartbeat-throttled progress reporting.

mod batch;
mod fetcher;
mod markdown;
mod parser;
mod recursive;
mod single;
mod sitemap;

pub use batch::BatchStrategy;
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use markdown::MarkdownFileStrategy;
pub use parser::extract_links;
pub use recursive::RecursiveStrategy;
pub use single::SinglePageStrategy;
pub use sitemap::SitemapStrategy;

use crate::orchestrator::CancellationToken;
use crate::{CrawlError, Result};
use std::sync::Arc;
use std::time::Duration;

/// One fetched unit of content, produced by a strategy and consumed by
/// the document-processing stage.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub markdown: String,
    pub html: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl From<FetchedPage> for CrawlResult {
    fn from(page: FetchedPage) -> Self {
        Self {
            url: page.url,
            markdown: page.markdown,
            html: page.html,
            success: page.success,
            error: page.error,
        }
    }
}

/// Bounded retry budget for transient fetch failures
///
/// `max_attempts` counts the initial try; backoff doubles per attempt
/// starting from `base_backoff`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based, exponential)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Fetches one URL with the retry budget applied, checking for
/// cancellation before every attempt.
///
/// Transport errors and `success = false` responses both count as
/// transient. The error returned after the budget is exhausted carries
/// the last failure message.
pub(crate) async fn fetch_with_retry(
    fetcher: &Arc<dyn PageFetcher>,
    url: &str,
    retry: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<FetchedPage> {
    let mut last_error = String::new();

    for attempt in 1..=retry.max_attempts {
        cancel.checkpoint()?;

        match fetcher.fetch(url).await {
            Ok(page) if page.success => return Ok(page),
            Ok(page) => {
                last_error = page
                    .error
                    .unwrap_or_else(|| "fetch reported failure".to_string());
            }
            Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
            Err(e) => last_error = e.to_string(),
        }

        if attempt < retry.max_attempts {
            let backoff = retry.backoff(attempt);
            tracing::debug!(
                "Fetch attempt {}/{} failed for {}: {} (retrying in {:?})",
                attempt,
                retry.max_attempts,
                url,
                last_error,
                backoff
            );
            tokio::time::sleep(backoff).await;
        }
    }

    Err(CrawlError::FetchExhausted {
        url: url.to_string(),
        attempts: retry.max_attempts,
        message: last_error,
    })
}
