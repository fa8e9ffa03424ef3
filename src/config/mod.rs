mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./moviehub.toml",
        "~/.config/moviehub/config.toml",
        "/etc/moviehub/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Secrets may come from the environment instead of the config file.
pub fn apply_env_overrides(config: &mut Config) {
    let overrides: [(&str, &mut String); 3] = [
        ("TMDB_API_KEY", &mut config.providers.tmdb.api_key),
        ("OMDB_API_KEY", &mut config.providers.omdb.api_key),
        ("LLM_API_KEY", &mut config.llm.api_key),
    ];

    for (var, slot) in overrides {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                tracing::debug!("Using {} from environment", var);
                *slot = value.trim().to_string();
            }
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let providers = [
        ("tmdb", &config.providers.tmdb),
        ("omdb", &config.providers.omdb),
        ("tvmaze", &config.providers.tvmaze),
    ];
    for (name, provider) in providers {
        if provider.timeout_secs == 0 {
            anyhow::bail!("Provider '{}' timeout must be greater than 0", name);
        }
        if provider.requests_per_second == 0 {
            anyhow::bail!("Provider '{}' rate limit must be greater than 0", name);
        }
        if provider.retry_attempts == 0 {
            anyhow::bail!("Provider '{}' needs at least one attempt", name);
        }
        if provider.enabled && name != "tvmaze" && provider.api_key.is_empty() {
            tracing::warn!("Provider '{}' is enabled but has no API key", name);
        }
    }

    if config.aggregation.provider_timeout_secs == 0 {
        anyhow::bail!("Aggregation provider timeout must be greater than 0");
    }
    if config.aggregation.default_limit == 0 {
        anyhow::bail!("Aggregation default limit must be greater than 0");
    }
    if config.cache.max_entries == 0 {
        anyhow::bail!("Cache max_entries must be greater than 0");
    }
    if config.llm.timeout_secs == 0 {
        anyhow::bail!("LLM timeout must be greater than 0");
    }
    if config.orchestrator.tool_timeout_secs == 0 || config.orchestrator.intent_timeout_secs == 0 {
        anyhow::bail!("Orchestrator timeouts must be greater than 0");
    }
    if config.gateway.register_attempts == 0 {
        anyhow::bail!("Gateway register_attempts must be at least 1");
    }
    if config.gateway.heartbeat_interval_secs == 0 {
        anyhow::bail!("Gateway heartbeat interval must be greater than 0");
    }
    if config.gateway.announce_to.is_some() && config.gateway.public_url.is_none() {
        anyhow::bail!("Gateway announce_to requires public_url");
    }

    Ok(())
}
