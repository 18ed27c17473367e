mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(content).context("Failed to parse config")?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./metaforged.toml",
        "~/.config/metaforged/config.toml",
        "/etc/metaforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            return load_config(path);
        }
    }

    Ok(EngineConfig::default())
}

/// Validate configuration
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    if config.cache.ttl_secs == 0 {
        anyhow::bail!("cache.ttl_secs cannot be 0");
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs cannot be 0");
    }

    if config.http.user_agent.trim().is_empty() {
        anyhow::bail!("http.user_agent cannot be empty");
    }

    if config.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts cannot be 0");
    }

    for (id, provider) in &config.providers {
        if !crate::metadata::manager::is_known_provider(id) {
            tracing::warn!("Unknown provider in config: {}", id);
        }
        if provider.max_requests == Some(0) {
            anyhow::bail!("providers.{}.max_requests cannot be 0", id);
        }
        if provider.window_ms == Some(0) {
            anyhow::bail!("providers.{}.window_ms cannot be 0", id);
        }
    }

    Ok(())
}
