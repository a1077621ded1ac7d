use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{GatewayOptions, Provider, ProviderConfig};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Session to open at startup. `None` leaves the gateway unconfigured
    /// until a client posts to `/api/v1/session`.
    pub llm: Option<ProviderConfig>,
    pub gateway: GatewayOptions,
    pub scrape_timeout: Duration,
    pub agent_instructions_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = GatewayOptions::default();

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: llm_from_env()?,
            gateway: GatewayOptions {
                request_timeout: secs_env("LLM_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
                health_timeout: secs_env("LLM_HEALTH_TIMEOUT_SECS", defaults.health_timeout)?,
            },
            scrape_timeout: secs_env("SCRAPE_TIMEOUT_SECS", Duration::from_secs(30))?,
            agent_instructions_path: optional_env("AGENT_INSTRUCTIONS_PATH").map(PathBuf::from),
        })
    }
}

fn llm_from_env() -> Result<Option<ProviderConfig>> {
    let Some(provider) = optional_env("LLM_PROVIDER") else {
        return Ok(None);
    };

    Ok(Some(ProviderConfig {
        provider: Provider::from(provider),
        model: require_env("LLM_MODEL")?,
        api_key: optional_env("LLM_API_KEY"),
        base_url: optional_env("LLM_BASE_URL"),
    }))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn secs_env(key: &str, default: Duration) -> Result<Duration> {
    match optional_env(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a whole number of seconds")),
        None => Ok(default),
    }
}
