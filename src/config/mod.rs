//! Fetch-layer configuration
//!
//! Settings for the HTTP layer can be supplied from a TOML file; everything
//! has a working default so the CLI runs without one.

use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::Path;

/// HTTP fetch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// User agent header sent with every request.
    pub user_agent: String,

    /// Total request timeout in seconds.
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum redirects to follow for one fetch.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("spindex/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: crate::fetch::REDIRECT_LIMIT,
        }
    }
}

/// Loads and validates fetch settings from a TOML file.
pub fn load_config(path: &Path) -> ConfigResult<FetchConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: FetchConfig = toml::from_str(&contents)?;
    validate(&config)?;
    Ok(config)
}

/// Rejects settings that would make the fetch layer inoperable.
fn validate(config: &FetchConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent must not be empty".to_string(),
        ));
    }
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be greater than zero".to_string(),
        ));
    }
    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
