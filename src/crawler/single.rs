//! Single-page fetch strategy

use super::{fetch_with_retry, CrawlResult, PageFetcher, RetryPolicy};
use crate::orchestrator::CancellationToken;
use crate::progress::StageReporter;
use crate::{CrawlError, Result};
use std::sync::Arc;

/// Fetches exactly one page, with the retry budget applied to
/// transient failures.
///
/// An exhausted retry budget is not an error at this level: it yields a
/// single `success = false` result and the pipeline's zero-successful
/// check decides the outcome. Only cancellation propagates as `Err`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePageStrategy {
    retry: RetryPolicy,
}

impl SinglePageStrategy {
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
        reporter.report(0, 1, &format!("Fetching {}", url));
        let page = match fetch_with_retry(fetcher, url, self.retry, cancel).await {
            Ok(page) => page,
            Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
            Err(e) => {
                reporter.report(1, 1, &format!("Failed to fetch {}", url));
                return Ok(vec![CrawlResult {
                    url: url.to_string(),
                    markdown: String::new(),
                    html: None,
                    success: false,
                    error: Some(e.to_string()),
                }]);
            }
        };
        reporter.report(1, 1, &format!("Fetched {}", page.url));
        Ok(vec![CrawlResult::from(page)])
    }
}
