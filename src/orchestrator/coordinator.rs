//! Crawl orchestration coordinator and stage pipeline
//!
//! One coordinator owns one job end-to-end: it holds the cancellation
//! flag and the progress tracker, registers itself in the registry, and
//! spawns the single background task that drives the pipeline
//! `starting -> analyzing -> crawling -> processing -> code_extraction
//! -> finalizing -> completed`, with `cancelled` and `failed` as the
//! two escape states.

use super::stages::{
    CodeExtractionStage, CodeExtractor, DocumentProcessingStage, DocumentStore,
    SourceFinalizationStage, SourceStatusStore,
};
use super::{CancellationToken, OrchestrationRegistry};
use crate::config::OrchestratorConfig;
use crate::crawler::{
    BatchStrategy, CrawlResult, MarkdownFileStrategy, PageFetcher, RecursiveStrategy, RetryPolicy,
    SinglePageStrategy, SitemapStrategy,
};
use crate::progress::{
    CrawlStage, CrawlProgressTracker, ProgressState, ProgressSubscriber, ProgressTracker,
    StageReporter,
};
use crate::url::{classify_url, UrlKind};
use crate::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// One orchestrated crawl request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    /// Link-following depth; 1 means the request URL only
    #[serde(default = "default_depth")]
    pub max_depth: u32,
    /// Bounded fan-out for batch fetches; None uses the configured default
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub extract_code_examples: bool,
    #[serde(default)]
    pub knowledge_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Identity used for source-status persistence; defaults to the
    /// request URL's host
    #[serde(default)]
    pub source_id: Option<String>,
}

fn default_depth() -> u32 {
    1
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: 1,
            max_concurrency: None,
            extract_code_examples: false,
            knowledge_type: None,
            tags: Vec::new(),
            source_id: None,
        }
    }

    /// The source identity this crawl is persisted under
    pub fn source_id(&self) -> String {
        if let Some(id) = &self.source_id {
            return id.clone();
        }
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// The external services a coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub documents: Arc<dyn DocumentStore>,
    pub code_examples: Arc<dyn CodeExtractor>,
    pub source_status: Arc<dyn SourceStatusStore>,
}

/// Entry point for one crawl job
pub struct CrawlOrchestrationCoordinator {
    job_id: String,
    request: CrawlRequest,
    config: OrchestratorConfig,
    collaborators: Collaborators,
    registry: Arc<OrchestrationRegistry>,
    cancel: CancellationToken,
    tracker: Arc<ProgressTracker>,
    progress: CrawlProgressTracker,
}

impl CrawlOrchestrationCoordinator {
    /// Creates a coordinator for `request`. The job id is generated
    /// unless a caller-supplied one is given via
    /// [`with_job_id`](Self::with_job_id) before orchestration.
    pub fn new(
        request: CrawlRequest,
        collaborators: Collaborators,
        registry: Arc<OrchestrationRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let job_id = Uuid::new_v4().to_string();
        let tracker = Arc::new(ProgressTracker::new());
        let progress = CrawlProgressTracker::new(job_id.clone(), Arc::clone(&tracker), None);
        Self {
            job_id,
            request,
            config,
            collaborators,
            registry,
            cancel: CancellationToken::new(),
            tracker,
            progress,
        }
    }

    /// Uses a caller-supplied job id instead of the generated one
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self.progress =
            CrawlProgressTracker::new(self.job_id.clone(), Arc::clone(&self.tracker), None);
        self
    }

    /// Registers the progress subscriber notified on every update
    pub fn with_subscriber(mut self, subscriber: ProgressSubscriber) -> Self {
        self.progress = CrawlProgressTracker::new(
            self.job_id.clone(),
            Arc::clone(&self.tracker),
            Some(subscriber),
        );
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn request(&self) -> &CrawlRequest {
        &self.request
    }

    /// Point-in-time progress snapshot for pollers
    pub fn progress_state(&self) -> ProgressState {
        self.tracker.snapshot()
    }

    /// Sets the cancellation flag. Cooperative: in-flight fetch units
    /// complete, and the pipeline observes the flag at its next
    /// checkpoint.
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested for job {}", self.job_id);
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Registers the job and spawns its background task. Returns the
    /// job id immediately; never blocks on crawl completion.
    pub async fn orchestrate(self: &Arc<Self>) -> String {
        self.registry
            .register(&self.job_id, Arc::clone(self))
            .await;

        let mut initial = Map::new();
        initial.insert("url".to_string(), Value::String(self.request.url.clone()));
        initial.insert(
            "source_id".to_string(),
            Value::String(self.request.source_id()),
        );
        self.progress.start(initial);

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run().await;
        });

        self.job_id.clone()
    }

    /// Background task body: drives the pipeline, then handles the
    /// terminal outcome. Unregistering happens on every exit path.
    ///
    /// The pipeline runs on an inner task so that a panicking
    /// collaborator cannot unwind past the terminal handling below: the
    /// panic surfaces as a join error, takes the failure path, and the
    /// job still unregisters.
    async fn run(self: Arc<Self>) {
        let pipeline = Arc::clone(&self);
        let outcome = tokio::spawn(async move { pipeline.execute_pipeline().await })
            .await
            .unwrap_or_else(|join_err| Err(CrawlError::Join(join_err)));

        match outcome {
            Ok(()) => {
                tracing::info!("Job {} completed", self.job_id);
            }
            Err(e) if e.is_cancellation() => {
                // Caller-initiated: not an error, and the source keeps
                // its prior persisted status.
                tracing::info!("Job {} cancelled", self.job_id);
                self.progress.cancelled("Crawl cancelled by caller");
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Job {} failed: {}", self.job_id, message);
                self.progress.fail(&message);

                let finalization =
                    SourceFinalizationStage::new(Arc::clone(&self.collaborators.source_status));
                if let Err(status_err) = finalization
                    .fail(&self.request.source_id(), &message)
                    .await
                {
                    tracing::error!(
                        "Failed to mark source {} as failed: {}",
                        self.request.source_id(),
                        status_err
                    );
                }
            }
        }

        self.registry.unregister(&self.job_id).await;
    }

    /// The linear stage pipeline. Any `Err` is an escape: `Cancelled`
    /// maps to the cancelled terminal state, everything else to failed.
    async fn execute_pipeline(&self) -> Result<()> {
        let source_id = self.request.source_id();

        // --- analyzing ---
        self.cancel.checkpoint()?;
        self.progress.update_mapped(
            CrawlStage::Analyzing,
            0,
            &format!("Analyzing {}", self.request.url),
            Map::new(),
        );

        let kind = classify_url(&self.request.url, self.request.max_depth);
        tracing::info!("Job {}: {} routed as {}", self.job_id, self.request.url, kind.as_str());

        // A sitemap is resolved to its URL list here, then crawled with
        // batch semantics.
        let batch_urls = if kind == UrlKind::Sitemap {
            let sitemap = SitemapStrategy::new(self.retry_policy());
            let urls = sitemap
                .parse(&self.collaborators.fetcher, &self.request.url, &self.cancel)
                .await?;
            tracing::info!("Job {}: sitemap expanded to {} URLs", self.job_id, urls.len());
            Some(urls)
        } else {
            None
        };

        let mut routed = Map::new();
        routed.insert(
            "crawl_type".to_string(),
            Value::String(kind.as_str().to_string()),
        );
        if let Some(urls) = &batch_urls {
            routed.insert("total_pages".to_string(), urls.len().into());
        }
        self.progress.update_mapped(
            CrawlStage::Analyzing,
            100,
            &format!("Classified as {}", kind.as_str()),
            routed,
        );

        // --- crawling ---
        self.cancel.checkpoint()?;
        let reporter = self.stage_reporter(CrawlStage::Crawling);
        reporter.boundary(0, "Starting fetch", Map::new());

        let results = match kind {
            UrlKind::SinglePage => {
                SinglePageStrategy::new(self.retry_policy())
                    .fetch(
                        &self.collaborators.fetcher,
                        &self.request.url,
                        &reporter,
                        &self.cancel,
                    )
                    .await?
            }
            UrlKind::MarkdownFile => {
                MarkdownFileStrategy::new(self.retry_policy())
                    .fetch(
                        &self.collaborators.fetcher,
                        &self.request.url,
                        &reporter,
                        &self.cancel,
                    )
                    .await?
            }
            UrlKind::Sitemap => {
                let urls = batch_urls.unwrap_or_default();
                self.batch_strategy(None)
                    .fetch(&self.collaborators.fetcher, &urls, &reporter, &self.cancel)
                    .await?
            }
            UrlKind::Recursive => {
                RecursiveStrategy::new(self.batch_strategy(None), self.request.max_depth)
                    .fetch(
                        &self.collaborators.fetcher,
                        std::slice::from_ref(&self.request.url),
                        &reporter,
                        &self.cancel,
                    )
                    .await?
            }
        };

        let successful = results.iter().filter(|r| r.success).count();
        if successful == 0 {
            return Err(CrawlError::NoContentCrawled {
                url: self.request.url.clone(),
            });
        }
        reporter.boundary(
            100,
            &format!("Fetched {} pages ({} ok)", results.len(), successful),
            Map::new(),
        );

        // --- processing ---
        self.cancel.checkpoint()?;
        let processing = DocumentProcessingStage::new(Arc::clone(&self.collaborators.documents));
        let summary = processing
            .run(&results, &self.request, &self.progress)
            .await?;

        // --- code extraction ---
        let mut code_examples_found = None;
        if self.request.extract_code_examples {
            self.cancel.checkpoint()?;
            let extraction =
                CodeExtractionStage::new(Arc::clone(&self.collaborators.code_examples));
            code_examples_found = Some(
                extraction
                    .run(&results, &source_id, &self.progress)
                    .await?,
            );
        }

        // --- finalizing ---
        self.cancel.checkpoint()?;
        let mut metadata = Map::new();
        metadata.insert("url".to_string(), Value::String(self.request.url.clone()));
        metadata.insert(
            "crawl_type".to_string(),
            Value::String(kind.as_str().to_string()),
        );
        metadata.insert("chunks_stored".to_string(), summary.chunks_stored.into());
        metadata.insert(
            "processed_pages".to_string(),
            summary.processed_pages.into(),
        );
        metadata.insert("total_pages".to_string(), summary.total_pages.into());
        if let Some(found) = code_examples_found {
            metadata.insert("code_examples_found".to_string(), found.into());
        }
        if let Some(knowledge_type) = &self.request.knowledge_type {
            metadata.insert(
                "knowledge_type".to_string(),
                Value::String(knowledge_type.clone()),
            );
        }
        if !self.request.tags.is_empty() {
            metadata.insert(
                "tags".to_string(),
                Value::Array(
                    self.request
                        .tags
                        .iter()
                        .map(|t| Value::String(t.clone()))
                        .collect(),
                ),
            );
        }

        let finalization =
            SourceFinalizationStage::new(Arc::clone(&self.collaborators.source_status));
        finalization
            .complete(&source_id, metadata, &self.progress)
            .await?;

        self.progress.complete(Map::new());
        Ok(())
    }

    // ---- direct delegation (single operations without the pipeline) ----

    /// Fetches one page, honoring this coordinator's cancellation flag
    pub async fn fetch_single_page(&self, url: &str) -> Result<Vec<CrawlResult>> {
        let reporter = self.stage_reporter(CrawlStage::Crawling);
        SinglePageStrategy::new(self.retry_policy())
            .fetch(&self.collaborators.fetcher, url, &reporter, &self.cancel)
            .await
    }

    /// Fetches one markdown/plain-text file verbatim
    pub async fn fetch_markdown_file(&self, url: &str) -> Result<Vec<CrawlResult>> {
        let reporter = self.stage_reporter(CrawlStage::Crawling);
        MarkdownFileStrategy::new(self.retry_policy())
            .fetch(&self.collaborators.fetcher, url, &reporter, &self.cancel)
            .await
    }

    /// Expands a sitemap (or sitemap index) into a flat URL list
    pub async fn parse_sitemap(&self, url: &str) -> Result<Vec<String>> {
        SitemapStrategy::new(self.retry_policy())
            .parse(&self.collaborators.fetcher, url, &self.cancel)
            .await
    }

    /// Batch-fetches an explicit URL list with bounded concurrency
    pub async fn fetch_batch(
        &self,
        urls: &[String],
        max_concurrency: Option<usize>,
    ) -> Result<Vec<CrawlResult>> {
        let reporter = self.stage_reporter(CrawlStage::Crawling);
        self.batch_strategy(max_concurrency)
            .fetch(&self.collaborators.fetcher, urls, &reporter, &self.cancel)
            .await
    }

    /// Recursively crawls from seed URLs up to `max_depth` hops
    pub async fn fetch_recursive(
        &self,
        seeds: &[String],
        max_depth: u32,
    ) -> Result<Vec<CrawlResult>> {
        let reporter = self.stage_reporter(CrawlStage::Crawling);
        RecursiveStrategy::new(self.batch_strategy(None), max_depth)
            .fetch(&self.collaborators.fetcher, seeds, &reporter, &self.cancel)
            .await
    }

    // ---- helpers ----

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.max_fetch_retries,
            base_backoff: Duration::from_millis(self.config.retry_backoff_ms),
        }
    }

    fn batch_strategy(&self, max_concurrency: Option<usize>) -> BatchStrategy {
        let concurrency = max_concurrency
            .or(self.request.max_concurrency)
            .unwrap_or(self.config.default_max_concurrency);
        BatchStrategy::new(self.retry_policy(), concurrency)
    }

    fn stage_reporter(&self, stage: CrawlStage) -> StageReporter {
        StageReporter::new(
            stage,
            self.progress.clone(),
            Duration::from_millis(self.config.heartbeat_interval_ms),
        )
    }
}
