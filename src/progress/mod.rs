//! Progress subsystem for crawl jobs
//!
//! This module reconciles heterogeneous stage-local progress (0-100 per
//! stage) into one monotonic overall percentage, throttles noisy
//! per-page callbacks, and exposes a pollable state record per job.

mod heartbeat;
mod mapper;
mod tracker;

pub use heartbeat::{Clock, HeartbeatManager, MonotonicClock};
pub use mapper::ProgressMapper;
pub use tracker::{
    CrawlProgressTracker, ProgressState, ProgressSubscriber, ProgressTracker, StageReporter,
};

use serde::Serialize;
use std::fmt;

/// One named phase of the crawl pipeline
///
/// Stages are the only values the progress mapper accepts, so an
/// unknown stage is unrepresentable rather than a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStage {
    Starting,
    Analyzing,
    Crawling,
    Processing,
    CodeExtraction,
    Finalizing,
}

/// Externally visible job status: every pipeline stage plus the three
/// terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Starting,
    Analyzing,
    Crawling,
    Processing,
    CodeExtraction,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
}

impl CrawlStatus {
    /// Returns true for the three states no job ever leaves
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl From<CrawlStage> for CrawlStatus {
    fn from(stage: CrawlStage) -> Self {
        match stage {
            CrawlStage::Starting => Self::Starting,
            CrawlStage::Analyzing => Self::Analyzing,
            CrawlStage::Crawling => Self::Crawling,
            CrawlStage::Processing => Self::Processing,
            CrawlStage::CodeExtraction => Self::CodeExtraction,
            CrawlStage::Finalizing => Self::Finalizing,
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Analyzing => "analyzing",
            Self::Crawling => "crawling",
            Self::Processing => "processing",
            Self::CodeExtraction => "code_extraction",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A single throttleable progress notification produced inside a stage
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// The stage this update belongs to
    pub stage: CrawlStage,
    /// Stage-local percentage in [0, 100]
    pub percent: u8,
    /// Units of work completed so far (pages, sitemap entries, ...)
    pub processed: usize,
    /// Total units of work known for the stage
    pub total: usize,
    /// Human-readable description
    pub log: String,
}
