//! End-to-end orchestration tests
//!
//! These tests drive the full pipeline with recording mock
//! collaborators: routing, fetching, document processing, source
//! finalization, cancellation, and the registry leak-free invariant.

use async_trait::async_trait;
use kumo_crawl::config::OrchestratorConfig;
use kumo_crawl::crawler::{CrawlResult, FetchedPage, PageFetcher};
use kumo_crawl::orchestrator::{
    Collaborators, CodeExtractor, CrawlOrchestrationCoordinator, CrawlRequest, DocumentStore,
    OrchestrationRegistry, SourceStatusStore, StorageSummary,
};
use kumo_crawl::{CrawlStatus, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves canned pages from memory, optionally delaying each fetch
struct MockFetcher {
    pages: HashMap<String, FetchedPage>,
    delay: Option<Duration>,
    fetch_count: AtomicUsize,
}

impl MockFetcher {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            delay: None,
            fetch_count: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn page(mut self, url: &str, markdown: &str, html: Option<&str>) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                url: url.to_string(),
                markdown: markdown.to_string(),
                html: html.map(str::to_string),
                success: true,
                error: None,
            },
        );
        self
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchedPage::failure(url, "HTTP 404")))
    }
}

/// Reports a fixed chunk count and records how often it ran
struct RecordingDocumentStore {
    chunks_stored: usize,
    calls: AtomicUsize,
}

impl RecordingDocumentStore {
    fn new(chunks_stored: usize) -> Self {
        Self {
            chunks_stored,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for RecordingDocumentStore {
    async fn process_and_store(
        &self,
        results: &[CrawlResult],
        _request: &CrawlRequest,
    ) -> Result<StorageSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let processed = results.iter().filter(|r| r.success).count();
        Ok(StorageSummary {
            chunks_stored: self.chunks_stored,
            processed_pages: processed,
            total_pages: results.len(),
        })
    }
}

struct RecordingCodeExtractor {
    found: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl CodeExtractor for RecordingCodeExtractor {
    async fn extract_and_store(&self, _results: &[CrawlResult], _source_id: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.found)
    }
}

/// Records every terminal status call
#[derive(Default)]
struct RecordingStatusStore {
    completed: Mutex<Vec<String>>,
    failed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SourceStatusStore for RecordingStatusStore {
    async fn mark_completed(&self, source_id: &str, _metadata: Map<String, Value>) -> Result<()> {
        self.completed.lock().unwrap().push(source_id.to_string());
        Ok(())
    }

    async fn mark_failed(&self, source_id: &str, error_message: &str) -> Result<()> {
        self.failed
            .lock()
            .unwrap()
            .push((source_id.to_string(), error_message.to_string()));
        Ok(())
    }
}

/// Config with a single fetch attempt and no backoff so failure paths
/// resolve quickly.
fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_fetch_retries: 1,
        retry_backoff_ms: 1,
        heartbeat_interval_ms: 1,
        default_max_concurrency: 2,
    }
}

struct Harness {
    registry: Arc<OrchestrationRegistry>,
    documents: Arc<RecordingDocumentStore>,
    code_examples: Arc<RecordingCodeExtractor>,
    statuses: Arc<RecordingStatusStore>,
    coordinator: Arc<CrawlOrchestrationCoordinator>,
}

fn build(fetcher: MockFetcher, request: CrawlRequest, chunks: usize) -> Harness {
    let registry = Arc::new(OrchestrationRegistry::new());
    let documents = Arc::new(RecordingDocumentStore::new(chunks));
    let code_examples = Arc::new(RecordingCodeExtractor {
        found: 4,
        calls: AtomicUsize::new(0),
    });
    let statuses = Arc::new(RecordingStatusStore::default());

    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        documents: Arc::clone(&documents) as Arc<dyn DocumentStore>,
        code_examples: Arc::clone(&code_examples) as Arc<dyn CodeExtractor>,
        source_status: Arc::clone(&statuses) as Arc<dyn SourceStatusStore>,
    };

    let coordinator = Arc::new(CrawlOrchestrationCoordinator::new(
        request,
        collaborators,
        Arc::clone(&registry),
        fast_config(),
    ));

    Harness {
        registry,
        documents,
        code_examples,
        statuses,
        coordinator,
    }
}

/// Polls until the job has unregistered itself (i.e. reached a
/// terminal state), panicking after five seconds.
async fn wait_for_terminal(registry: &OrchestrationRegistry, job_id: &str) {
    for _ in 0..500 {
        if registry.get(job_id).await.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

const SITEMAP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
    <url><loc>https://example.com/a</loc></url>
    <url><loc>https://example.com/b</loc></url>
</urlset>"#;

#[tokio::test]
async fn sitemap_job_completes_with_storage_counts() {
    let fetcher = MockFetcher::new()
        .page("https://example.com/sitemap.xml", SITEMAP_XML, None)
        .page("https://example.com/a", "# Page A", Some("<h1>A</h1>"))
        .page("https://example.com/b", "# Page B", Some("<h1>B</h1>"));

    let harness = build(fetcher, CrawlRequest::new("https://example.com/sitemap.xml"), 12);
    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert_eq!(state.overall_percent, 100);
    assert_eq!(state.extra["crawl_type"], "sitemap");
    assert_eq!(state.extra["chunks_stored"], 12);
    assert_eq!(state.extra["processed_pages"], 2);

    assert_eq!(harness.documents.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        harness.statuses.completed.lock().unwrap().as_slice(),
        ["example.com"]
    );
    assert!(harness.statuses.failed.lock().unwrap().is_empty());
    // Extraction was not requested.
    assert_eq!(harness.code_examples.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sitemap_expansion_fetches_each_listed_url_once() {
    let fetcher = MockFetcher::new()
        .page("https://example.com/sitemap.xml", SITEMAP_XML, None)
        .page("https://example.com/a", "# Page A", None)
        .page("https://example.com/b", "# Page B", None);
    let counter = Arc::new(fetcher);
    let counting = Arc::clone(&counter);

    struct Forwarder(Arc<MockFetcher>);

    #[async_trait]
    impl PageFetcher for Forwarder {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.0.fetch(url).await
        }
    }

    let registry = Arc::new(OrchestrationRegistry::new());
    let collaborators = Collaborators {
        fetcher: Arc::new(Forwarder(counting)),
        documents: Arc::new(RecordingDocumentStore::new(1)),
        code_examples: Arc::new(RecordingCodeExtractor {
            found: 0,
            calls: AtomicUsize::new(0),
        }),
        source_status: Arc::new(RecordingStatusStore::default()),
    };
    let coordinator = Arc::new(CrawlOrchestrationCoordinator::new(
        CrawlRequest::new("https://example.com/sitemap.xml"),
        collaborators,
        Arc::clone(&registry),
        fast_config(),
    ));

    let job_id = coordinator.orchestrate().await;
    wait_for_terminal(&registry, &job_id).await;

    assert_eq!(coordinator.progress_state().status, CrawlStatus::Completed);
    assert_eq!(counter.fetch_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn empty_sitemap_fails_with_no_content() {
    let empty = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#;
    let fetcher = MockFetcher::new().page("https://example.com/sitemap.xml", empty, None);

    let harness = build(fetcher, CrawlRequest::new("https://example.com/sitemap.xml"), 0);
    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Failed);
    assert!(
        state.log.contains("No content could be crawled"),
        "unexpected failure log: {}",
        state.log
    );

    let failed = harness.statuses.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "example.com");
    assert!(harness.statuses.completed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_single_page_fails_after_retries() {
    // No pages configured: every fetch is a 404.
    let harness = build(
        MockFetcher::new(),
        CrawlRequest::new("https://example.com/missing"),
        0,
    );
    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Failed);
    // A dead URL is a no-content outcome, not a retry-machinery error.
    assert!(
        state.log.contains("No content could be crawled"),
        "unexpected failure log: {}",
        state.log
    );
    assert_eq!(harness.statuses.failed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_job_leaves_source_status_untouched() {
    let fetcher = MockFetcher::new()
        .page("https://example.com/sitemap.xml", SITEMAP_XML, None)
        .page("https://example.com/a", "# Page A", None)
        .page("https://example.com/b", "# Page B", None)
        .with_delay(Duration::from_millis(100));

    let harness = build(fetcher, CrawlRequest::new("https://example.com/sitemap.xml"), 12);
    let job_id = harness.coordinator.orchestrate().await;

    // Cancel through the registry, like an external API would.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let running = harness
        .registry
        .get(&job_id)
        .await
        .expect("job should still be registered mid-crawl");
    running.cancel();
    assert!(running.is_cancelled());

    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Cancelled);
    assert!(state.overall_percent < 100);
    assert!(harness.statuses.completed.lock().unwrap().is_empty());
    assert!(harness.statuses.failed.lock().unwrap().is_empty());
    assert!(harness.registry.get(&job_id).await.is_none());
}

#[tokio::test]
async fn markdown_file_route_fetches_verbatim() {
    let fetcher = MockFetcher::new().page("https://example.com/llms.txt", "plain text body", None);

    let mut request = CrawlRequest::new("https://example.com/llms.txt");
    request.max_depth = 3; // extension still wins over depth
    let harness = build(fetcher, request, 1);

    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert_eq!(state.extra["crawl_type"], "markdown_file");
}

#[tokio::test]
async fn recursive_route_follows_links_and_skips_self() {
    let seed_html = r##"<html><body>
        <a href="https://example.com/docs/">self link</a>
        <a href="/child">child</a>
    </body></html>"##;
    let fetcher = MockFetcher::new()
        .page("https://example.com/docs", "# Docs", Some(seed_html))
        .page("https://example.com/child", "# Child", Some("<p>leaf</p>"));

    let mut request = CrawlRequest::new("https://example.com/docs");
    request.max_depth = 2;
    let harness = build(fetcher, request, 3);

    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert_eq!(state.extra["crawl_type"], "recursive");
    // Seed plus the one non-self child.
    assert_eq!(state.extra["total_pages"], 2);
}

#[tokio::test]
async fn code_extraction_runs_when_requested() {
    let fetcher = MockFetcher::new().page("https://example.com/page", "# P", None);

    let mut request = CrawlRequest::new("https://example.com/page");
    request.extract_code_examples = true;
    let harness = build(fetcher, request, 2);

    let job_id = harness.coordinator.orchestrate().await;
    wait_for_terminal(&harness.registry, &job_id).await;

    let state = harness.coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert_eq!(state.extra["code_examples_found"], 4);
    assert_eq!(harness.code_examples.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delegation_methods_work_without_orchestration() {
    let fetcher = MockFetcher::new()
        .page("https://example.com/sitemap.xml", SITEMAP_XML, None)
        .page("https://example.com/a", "# A", None);

    let harness = build(fetcher, CrawlRequest::new("https://example.com/whatever"), 0);

    let urls = harness
        .coordinator
        .parse_sitemap("https://example.com/sitemap.xml")
        .await
        .unwrap();
    assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);

    // Partial success inside a batch: /b is a 404 but /a comes through.
    let results = harness.coordinator.fetch_batch(&urls, Some(2)).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.success).count(), 1);

    // Nothing registered, nothing leaked.
    assert!(harness.registry.is_empty().await);
}

#[tokio::test]
async fn crashed_processing_stage_still_unregisters_job() {
    struct PanickingDocumentStore;

    #[async_trait]
    impl DocumentStore for PanickingDocumentStore {
        async fn process_and_store(
            &self,
            _results: &[CrawlResult],
            _request: &CrawlRequest,
        ) -> Result<StorageSummary> {
            panic!("document store crashed");
        }
    }

    let fetcher = MockFetcher::new().page("https://example.com/page", "# P", None);
    let registry = Arc::new(OrchestrationRegistry::new());
    let statuses = Arc::new(RecordingStatusStore::default());

    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        documents: Arc::new(PanickingDocumentStore),
        code_examples: Arc::new(RecordingCodeExtractor {
            found: 0,
            calls: AtomicUsize::new(0),
        }),
        source_status: Arc::clone(&statuses) as Arc<dyn SourceStatusStore>,
    };
    let coordinator = Arc::new(CrawlOrchestrationCoordinator::new(
        CrawlRequest::new("https://example.com/page"),
        collaborators,
        Arc::clone(&registry),
        fast_config(),
    ));

    let job_id = coordinator.orchestrate().await;
    wait_for_terminal(&registry, &job_id).await;

    // The crash must not leave the job registered or mid-flight.
    assert!(registry.get(&job_id).await.is_none());
    let state = coordinator.progress_state();
    assert_eq!(state.status, CrawlStatus::Failed);
    assert_eq!(statuses.failed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn caller_supplied_job_id_is_used() {
    let fetcher = MockFetcher::new().page("https://example.com/page", "# P", None);
    let registry = Arc::new(OrchestrationRegistry::new());
    let statuses = Arc::new(RecordingStatusStore::default());

    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        documents: Arc::new(RecordingDocumentStore::new(1)),
        code_examples: Arc::new(RecordingCodeExtractor {
            found: 0,
            calls: AtomicUsize::new(0),
        }),
        source_status: statuses,
    };

    let coordinator = Arc::new(
        CrawlOrchestrationCoordinator::new(
            CrawlRequest::new("https://example.com/page"),
            collaborators,
            Arc::clone(&registry),
            fast_config(),
        )
        .with_job_id("job-42"),
    );

    let job_id = coordinator.orchestrate().await;
    assert_eq!(job_id, "job-42");
    wait_for_terminal(&registry, "job-42").await;
    assert_eq!(coordinator.progress_state().status, CrawlStatus::Completed);
}
