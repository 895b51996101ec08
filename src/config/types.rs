use serde::Deserialize;

/// Main configuration structure for Kumo-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Attempts per fetch unit before a transient failure escalates
    #[serde(rename = "max-fetch-retries", default = "default_retries")]
    pub max_fetch_retries: u32,

    /// Base delay before the first retry; doubles per attempt
    #[serde(rename = "retry-backoff-ms", default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Minimum time between throttled progress callbacks
    #[serde(rename = "heartbeat-interval-ms", default = "default_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,

    /// Concurrent fetch cap used when a request does not specify one
    #[serde(rename = "default-max-concurrency", default = "default_concurrency")]
    pub default_max_concurrency: usize,
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_heartbeat_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_fetch_retries: default_retries(),
            retry_backoff_ms: default_backoff_ms(),
            heartbeat_interval_ms: default_heartbeat_ms(),
            default_max_concurrency: default_concurrency(),
        }
    }
}

/// HTTP client identification
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name", default = "default_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url", default = "default_contact")]
    pub contact_url: String,
}

fn default_name() -> String {
    "KumoCrawl".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact() -> String {
    "https://github.com/kumo-crawl".to_string()
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_name(),
            crawler_version: default_version(),
            contact_url: default_contact(),
        }
    }
}
