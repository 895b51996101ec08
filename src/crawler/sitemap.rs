//! Sitemap expansion strategy
//!
//! Parses a sitemap (or sitemap index) into a flat URL list. This
//! strategy performs no page-content fetches itself; the resulting
//! list is handed to the batch strategy by the pipeline.

use super::{fetch_with_retry, PageFetcher, RetryPolicy};
use crate::orchestrator::CancellationToken;
use crate::{CrawlError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Expands sitemap documents into page URL lists
#[derive(Debug, Clone, Copy, Default)]
pub struct SitemapStrategy {
    retry: RetryPolicy,
}

impl SitemapStrategy {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Fetches and parses the sitemap at `sitemap_url`.
    ///
    /// A `<sitemapindex>` document is expanded exactly one level deep:
    /// each referenced sub-sitemap is fetched (with a cancellation
    /// check in between) and its `<loc>` entries are collected.
    /// Sub-sitemaps that fail to fetch are skipped, not fatal.
    pub async fn parse(
        &self,
        fetcher: &Arc<dyn PageFetcher>,
        sitemap_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        cancel.checkpoint()?;

        let page = match fetch_with_retry(fetcher, sitemap_url, self.retry, cancel).await {
            Ok(page) => page,
            Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
            Err(e) => {
                return Err(CrawlError::Sitemap {
                    url: sitemap_url.to_string(),
                    message: e.to_string(),
                })
            }
        };
        let body = &page.markdown;

        if !is_sitemap_index(body) {
            return Ok(dedupe(extract_loc_values(body)));
        }

        tracing::info!("{} is a sitemap index, expanding one level", sitemap_url);
        let mut urls = Vec::new();
        for sub_sitemap in extract_loc_values(body) {
            cancel.checkpoint()?;
            match fetch_with_retry(fetcher, &sub_sitemap, self.retry, cancel).await {
                Ok(sub_page) => urls.extend(extract_loc_values(&sub_page.markdown)),
                Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
                Err(e) => {
                    tracing::warn!("Skipping unreadable sub-sitemap {}: {}", sub_sitemap, e);
                }
            }
        }

        Ok(dedupe(urls))
    }
}

/// A sitemap index wraps its entries in `<sitemapindex>` instead of
/// `<urlset>`.
fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// Pulls every `<loc>` value out of a sitemap document.
///
/// Sitemaps in the wild are malformed often enough that a tolerant
/// string scan beats a strict XML parse here.
fn extract_loc_values(xml: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0usize;
    while let Some(open_idx) = xml[start..].find("<loc>") {
        let open = start + open_idx + 5;
        let Some(close_rel) = xml[open..].find("</loc>") else {
            break;
        };
        let close = open + close_rel;
        let value = xml[open..close].trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            out.push(value.to_string());
        }
        start = close + 6;
    }
    out
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>https://example.com/a</loc></url>
            <url><loc> https://example.com/b </loc></url>
            <url><loc>https://example.com/a</loc></url>
        </urlset>"#;

    #[test]
    fn test_extract_loc_values() {
        let urls = extract_loc_values(URLSET);
        assert_eq!(
            urls,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/a",
            ]
        );
    }

    #[test]
    fn test_dedupe_preserves_order() {
        let urls = dedupe(extract_loc_values(URLSET));
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_non_http_loc_dropped() {
        let xml = "<urlset><url><loc>ftp://example.com/x</loc></url></urlset>";
        assert!(extract_loc_values(xml).is_empty());
    }

    #[test]
    fn test_unclosed_loc_is_ignored() {
        let xml = "<urlset><url><loc>https://example.com/a</urlset>";
        assert!(extract_loc_values(xml).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_sitemap_surfaces_sitemap_error() {
        use super::super::FetchedPage;
        use crate::orchestrator::CancellationToken;
        use std::time::Duration;

        struct FailingFetcher;

        #[async_trait::async_trait]
        impl PageFetcher for FailingFetcher {
            async fn fetch(&self, url: &str) -> crate::Result<FetchedPage> {
                Ok(FetchedPage::failure(url, "HTTP 503"))
            }
        }

        let fetcher: Arc<dyn PageFetcher> = Arc::new(FailingFetcher);
        let strategy = SitemapStrategy::new(RetryPolicy {
            max_attempts: 1,
            base_backoff: Duration::from_millis(1),
        });

        let err = strategy
            .parse(&fetcher, "https://ex.com/sitemap.xml", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Sitemap { .. }));
    }

    #[test]
    fn test_sitemap_index_detection() {
        assert!(is_sitemap_index(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></sitemapindex>"#
        ));
        assert!(!is_sitemap_index(URLSET));
    }
}
