//! Local collaborator implementations
//!
//! Reference implementations of the pipeline's collaborator traits so
//! the binary can run the whole orchestration without an external
//! storage service: fetched markdown lands in a directory, source
//! status goes to the log.

use crate::crawler::CrawlResult;
use crate::orchestrator::{CodeExtractor, CrawlRequest, DocumentStore, SourceStatusStore, StorageSummary};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Stores each successfully fetched page as a markdown file
pub struct MarkdownDirStore {
    dir: PathBuf,
}

impl MarkdownDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentStore for MarkdownDirStore {
    async fn process_and_store(
        &self,
        results: &[CrawlResult],
        request: &CrawlRequest,
    ) -> Result<StorageSummary> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut stored = 0usize;
        for result in results.iter().filter(|r| r.success) {
            let path = self.dir.join(format!("{}.md", file_stem(&result.url)));
            tokio::fs::write(&path, &result.markdown).await?;
            stored += 1;
        }

        tracing::info!(
            "Stored {} pages for {} under {}",
            stored,
            request.source_id(),
            self.dir.display()
        );

        Ok(StorageSummary {
            chunks_stored: stored,
            processed_pages: stored,
            total_pages: results.len(),
        })
    }
}

/// Turns a URL into a filesystem-safe file stem
fn file_stem(url: &str) -> String {
    let stem: String = url
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let trimmed = stem.trim_matches('-');
    if trimmed.is_empty() {
        "page".to_string()
    } else {
        // Keep names short enough for any filesystem.
        trimmed.chars().take(120).collect()
    }
}

/// Code extractor that extracts nothing
///
/// Used when the caller did not request code examples but the
/// coordinator still needs the collaborator wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCodeExtractor;

#[async_trait]
impl CodeExtractor for NullCodeExtractor {
    async fn extract_and_store(&self, _results: &[CrawlResult], _source_id: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Source status persistence that records outcomes in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStatusStore;

#[async_trait]
impl SourceStatusStore for LoggingStatusStore {
    async fn mark_completed(&self, source_id: &str, metadata: Map<String, Value>) -> Result<()> {
        let summary = serde_json::to_string(&metadata)
            .map_err(|e| CrawlError::SourceStatus(e.to_string()))?;
        tracing::info!("Source {} completed: {}", source_id, summary);
        Ok(())
    }

    async fn mark_failed(&self, source_id: &str, error_message: &str) -> Result<()> {
        tracing::warn!("Source {} failed: {}", source_id, error_message);
        Ok(())
    }
}
