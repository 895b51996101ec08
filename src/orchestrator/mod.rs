//! Crawl orchestration: job coordinator, registry, stage pipeline
//!
//! The coordinator is the entry point for a crawl request: it owns the
//! cancellation flag and the progress tracker, registers itself in the
//! process-wide registry, and runs the stage pipeline on one spawned
//! background task.

mod cancel;
mod coordinator;
mod registry;
mod stages;

pub use cancel::CancellationToken;
pub use coordinator::{Collaborators, CrawlOrchestrationCoordinator, CrawlRequest};
pub use registry::OrchestrationRegistry;
pub use stages::{
    CodeExtractionStage, CodeExtractor, DocumentProcessingStage, DocumentStore,
    SourceFinalizationStage, SourceStatusStore, StorageSummary,
};
