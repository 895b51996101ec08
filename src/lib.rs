//! Kumo-Crawl: an asynchronous web-crawl orchestration engine
//!
//! This crate turns a single "crawl this URL" request into a supervised,
//! cancellable background job: the request is classified by URL shape,
//! fetched by the matching strategy, handed to document/code-extraction
//! collaborators, and finalized, while progress is streamed to any
//! number of polling subscribers through a stage-aware tracker.

pub mod config;
pub mod crawler;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod url;

use thiserror::Error;

/// Main error type for Kumo-Crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No content could be crawled from {url}")]
    NoContentCrawled { url: String },

    #[error("Fetch failed for {url} after {attempts} attempts: {message}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Failed to parse sitemap at {url}: {message}")]
    Sitemap { url: String, message: String },

    #[error("Document storage error: {0}")]
    Storage(String),

    #[error("Code extraction error: {0}")]
    CodeExtraction(String),

    #[error("Source status error: {0}")]
    SourceStatus(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if this error represents caller-initiated cancellation
    /// rather than a genuine failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Kumo-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, PageFetcher};
pub use orchestrator::{
    CancellationToken, CrawlOrchestrationCoordinator, CrawlRequest, OrchestrationRegistry,
};
pub use progress::{CrawlStage, CrawlStatus, ProgressState};
pub use url::{classify_url, is_self_link, normalize_url, UrlKind};
