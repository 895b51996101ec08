//! Bounded-concurrency batch fetch strategy

use super::{fetch_with_retry, CrawlResult, PageFetcher, RetryPolicy};
use crate::orchestrator::CancellationToken;
use crate::progress::StageReporter;
use crate::{CrawlError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fetches an explicit URL list with at most `max_concurrency` fetches
/// in flight.
///
/// Cancellation is checked before each unit is dispatched: once
/// observed, no further units start, already-in-flight units run to
/// completion, and the whole call resolves to `Err(Cancelled)`.
/// Individual fetch failures do not abort the batch; they become
/// `success = false` results (partial success is allowed within a
/// strategy).
#[derive(Debug, Clone, Copy)]
pub struct BatchStrategy {
    retry: RetryPolicy,
    max_concurrency: usize,
}

impl BatchStrategy {
    pub fn new(retry: RetryPolicy, max_concurrency: usize) -> Self {
        Self {
            retry,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn fetch(
        &self,
        fetcher: &Arc<dyn PageFetcher>,
        urls: &[String],
        reporter: &StageReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlResult>> {
        let total = urls.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<CrawlResult> = JoinSet::new();
        let mut results = Vec::with_capacity(total);
        let mut processed = 0usize;
        let mut dispatch_aborted = false;

        for url in urls {
            if cancel.is_cancelled() {
                tracing::info!(
                    "Cancellation observed, aborting batch dispatch ({} of {} dispatched)",
                    results.len() + tasks.len(),
                    total
                );
                dispatch_aborted = true;
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CrawlError::Cancelled)?;
            let fetcher = Arc::clone(fetcher);
            let url = url.clone();
            let retry = self.retry;
            let unit_cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                match fetch_with_retry(&fetcher, &url, retry, &unit_cancel).await {
                    Ok(page) => CrawlResult::from(page),
                    Err(e) => {
                        tracing::warn!("Batch unit failed for {}: {}", url, e);
                        CrawlResult {
                            url,
                            markdown: String::new(),
                            html: None,
                            success: false,
                            error: Some(e.to_string()),
                        }
                    }
                }
            });

            // Drain completions eagerly so progress stays live even
            // while dispatch continues.
            while let Some(done) = tasks.try_join_next() {
                processed += 1;
                collect(&mut results, done?, processed, total, reporter);
            }
        }

        // In-flight units complete even when dispatch was aborted.
        while let Some(done) = tasks.join_next().await {
            processed += 1;
            collect(&mut results, done?, processed, total, reporter);
        }

        if dispatch_aborted || cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        Ok(results)
    }
}

fn collect(
    results: &mut Vec<CrawlResult>,
    result: CrawlResult,
    processed: usize,
    total: usize,
    reporter: &StageReporter,
) {
    reporter.report(
        processed,
        total,
        &format!("Fetched {} of {} pages", processed, total),
    );
    results.push(result);
}
