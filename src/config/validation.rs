//! Configuration validation

use super::types::Config;
use crate::{ConfigError, ConfigResult};

/// Checks a parsed configuration for values the orchestrator cannot
/// run with.
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    let orch = &config.orchestrator;

    if orch.max_fetch_retries == 0 {
        return Err(ConfigError::Validation(
            "max-fetch-retries must be at least 1".to_string(),
        ));
    }

    if orch.default_max_concurrency == 0 {
        return Err(ConfigError::Validation(
            "default-max-concurrency must be at least 1".to_string(),
        ));
    }

    if orch.heartbeat_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "heartbeat-interval-ms must be non-zero".to_string(),
        ));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name must not be empty".to_string(),
        ));
    }

    Ok(())
}
