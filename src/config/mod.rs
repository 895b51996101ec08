//! Configuration module for Kumo-Crawl
//!
//! Orchestrator knobs (retry budget, backoff, heartbeat interval,
//! default fan-out) and the HTTP client identity, loadable from a TOML
//! file with an integrity hash.

mod parser;
mod types;
mod validation;

pub use parser::{load_config, load_config_with_hash};
pub use types::{Config, OrchestratorConfig, UserAgentConfig};
pub use validation::validate_config;
