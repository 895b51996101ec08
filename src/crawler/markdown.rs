//! Markdown/plain-text file fetch strategy

use super::{fetch_with_retry, CrawlResult, PageFetcher, RetryPolicy};
use crate::orchestrator::CancellationToken;
use crate::progress::StageReporter;
use crate::{CrawlError, Result};
use std::sync::Arc;

/// Fetches one markdown or plain-text file verbatim
///
/// Like the single-page strategy but the response body is required to
/// be non-HTML text; whatever came back is used as the markdown content
/// unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFileStrategy {
    retry: RetryPolicy,
}

impl MarkdownFileStrategy {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    pub async fn fetch(
        &self,
        fetcher: &Arc<dyn PageFetcher>,
        url: &str,
        reporter: &StageReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlResult>> {
        reporter.report(0, 1, &format!("Fetching file {}", url));
        let page = fetch_with_retry(fetcher, url, self.retry, cancel).await?;

        if page.markdown.trim().is_empty() {
            return Err(CrawlError::NoContentCrawled {
                url: url.to_string(),
            });
        }

        reporter.report(1, 1, &format!("Fetched file {}", page.url));
        Ok(vec![CrawlResult {
            url: page.url,
            markdown: page.markdown,
            html: None,
            success: true,
            error: None,
        }])
    }
}
