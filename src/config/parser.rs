//! TOML configuration loading

use super::types::Config;
use super::validation::validate_config;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Loads and validates a configuration file
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let (config, _hash) = load_config_with_hash(path)?;
    Ok(config)
}

/// Loads a configuration file, returning the parsed config together
/// with the SHA-256 hex digest of its raw content. The hash is logged
/// at startup so runs can be correlated with the exact config that
/// produced them.
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = fs::read_to_string(path)?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let config: Config = toml::from_str(&content)?;
    validate_config(&config)?;

    Ok((config, hash))
}
