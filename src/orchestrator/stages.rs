//! Post-fetch pipeline stages
//!
//! The storage, embedding, code-extraction, and status-persistence
//! services are external collaborators; this module defines their
//! contracts and the thin stage wrappers the pipeline drives them
//! through.

use super::CrawlRequest;
use crate::crawler::CrawlResult;
use crate::progress::{CrawlStage, CrawlProgressTracker};
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Counts reported back by the document storage service
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageSummary {
    pub chunks_stored: usize,
    pub processed_pages: usize,
    pub total_pages: usize,
}

/// Document storage/embedding service boundary
///
/// Not assumed idempotent per source: a retry of the whole job is a
/// new job.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn process_and_store(
        &self,
        results: &[CrawlResult],
        request: &CrawlRequest,
    ) -> Result<StorageSummary>;
}

/// Code-example extraction service boundary
#[async_trait]
pub trait CodeExtractor: Send + Sync {
    /// Returns the number of code examples found and stored
    async fn extract_and_store(&self, results: &[CrawlResult], source_id: &str) -> Result<usize>;
}

/// Source status persistence boundary
#[async_trait]
pub trait SourceStatusStore: Send + Sync {
    async fn mark_completed(&self, source_id: &str, metadata: Map<String, Value>) -> Result<()>;
    async fn mark_failed(&self, source_id: &str, error_message: &str) -> Result<()>;
}

/// Chunk/embed/store stage
pub struct DocumentProcessingStage {
    store: Arc<dyn DocumentStore>,
}

impl DocumentProcessingStage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        &self,
        results: &[CrawlResult],
        request: &CrawlRequest,
        progress: &CrawlProgressTracker,
    ) -> Result<StorageSummary> {
        progress.update_mapped(
            CrawlStage::Processing,
            0,
            &format!("Storing {} documents", results.len()),
            Map::new(),
        );

        let summary = self.store.process_and_store(results, request).await?;

        let mut extra = Map::new();
        extra.insert("chunks_stored".to_string(), summary.chunks_stored.into());
        extra.insert("processed_pages".to_string(), summary.processed_pages.into());
        extra.insert("total_pages".to_string(), summary.total_pages.into());
        progress.update_mapped(
            CrawlStage::Processing,
            100,
            &format!("Stored {} chunks", summary.chunks_stored),
            extra,
        );

        Ok(summary)
    }
}

/// Code-example extraction stage
pub struct CodeExtractionStage {
    extractor: Arc<dyn CodeExtractor>,
}

impl CodeExtractionStage {
    pub fn new(extractor: Arc<dyn CodeExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn run(
        &self,
        results: &[CrawlResult],
        source_id: &str,
        progress: &CrawlProgressTracker,
    ) -> Result<usize> {
        progress.update_mapped(
            CrawlStage::CodeExtraction,
            0,
            "Extracting code examples",
            Map::new(),
        );

        let found = self.extractor.extract_and_store(results, source_id).await?;

        let mut extra = Map::new();
        extra.insert("code_examples_found".to_string(), found.into());
        progress.update_mapped(
            CrawlStage::CodeExtraction,
            100,
            &format!("Extracted {} code examples", found),
            extra,
        );

        Ok(found)
    }
}

/// Terminal source-status stage
pub struct SourceFinalizationStage {
    statuses: Arc<dyn SourceStatusStore>,
}

impl SourceFinalizationStage {
    pub fn new(statuses: Arc<dyn SourceStatusStore>) -> Self {
        Self { statuses }
    }

    /// Marks the source completed; called only on the success path
    pub async fn complete(
        &self,
        source_id: &str,
        metadata: Map<String, Value>,
        progress: &CrawlProgressTracker,
    ) -> Result<()> {
        progress.update_mapped(
            CrawlStage::Finalizing,
            0,
            "Finalizing source status",
            Map::new(),
        );
        self.statuses.mark_completed(source_id, metadata).await?;
        progress.update_mapped(CrawlStage::Finalizing, 100, "Source finalized", Map::new());
        Ok(())
    }

    /// Marks the source failed; called for genuine failures but never
    /// for cancellation (a cancelled source keeps its prior status).
    pub async fn fail(&self, source_id: &str, error_message: &str) -> Result<()> {
        self.statuses.mark_failed(source_id, error_message).await
    }
}
