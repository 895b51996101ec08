//! Depth-bounded recursive crawl strategy

use super::{extract_links, BatchStrategy, CrawlResult, PageFetcher};
use crate::orchestrator::CancellationToken;
use crate::progress::StageReporter;
use crate::url::{is_self_link, normalize_url};
use crate::Result;
use serde_json::Map;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Crawls outward from seed URLs, expanding discovered links up to
/// `max_depth` hops.
///
/// Each depth's frontier is de-duplicated by normalized URL and fetched
/// with batch semantics. Links that resolve back to the page they were
/// found on are dropped before they ever enter the frontier.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveStrategy {
    batch: BatchStrategy,
    max_depth: u32,
}

impl RecursiveStrategy {
    pub fn new(batch: BatchStrategy, max_depth: u32) -> Self {
        Self {
            batch,
            max_depth: max_depth.max(1),
        }
    }

    pub async fn fetch(
        &self,
        fetcher: &Arc<dyn PageFetcher>,
        seeds: &[String],
        reporter: &StageReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlResult>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier = dedupe_frontier(seeds, &mut visited);
        let mut results = Vec::new();

        for depth in 0..self.max_depth {
            if frontier.is_empty() {
                break;
            }
            cancel.checkpoint()?;

            reporter.boundary(
                (depth * 100 / self.max_depth) as u8,
                &format!(
                    "Depth {}/{}: fetching {} pages",
                    depth + 1,
                    self.max_depth,
                    frontier.len()
                ),
                Map::new(),
            );

            let depth_results = self.batch.fetch(fetcher, &frontier, reporter, cancel).await?;

            // Last depth: fetched pages are leaves, skip link expansion.
            let expand = depth + 1 < self.max_depth;
            let mut next_frontier = Vec::new();

            for result in &depth_results {
                if expand && result.success {
                    next_frontier.extend(discover_links(result));
                }
            }

            results.extend(depth_results);
            frontier = dedupe_frontier(&next_frontier, &mut visited);
        }

        Ok(results)
    }
}

/// Extracts links from one fetched page, dropping self-links
fn discover_links(result: &CrawlResult) -> Vec<String> {
    let html = match &result.html {
        Some(html) => html,
        None => return Vec::new(),
    };
    let base = match Url::parse(&result.url) {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };

    extract_links(html, &base)
        .into_iter()
        .filter(|link| !is_self_link(link, &result.url))
        .collect()
}

/// Normalizes candidate URLs and keeps each one only the first time it
/// is seen across the whole crawl.
fn dedupe_frontier(candidates: &[String], visited: &mut HashSet<String>) -> Vec<String> {
    let mut frontier = Vec::new();
    for candidate in candidates {
        let normalized = match normalize_url(candidate) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Dropping unnormalizable URL {}: {}", candidate, e);
                continue;
            }
        };
        if visited.insert(normalized.clone()) {
            frontier.push(normalized);
        }
    }
    frontier
}
