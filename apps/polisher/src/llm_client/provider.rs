//! Provider identities, wire-protocol families, and session configuration.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::LlmError;

/// Base URL used for the local tool-execution bridge when none is configured.
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8734";

/// An LLM vendor as named in the session configuration.
///
/// Parsing is total: any id that is not one of the known vendors becomes
/// `Other`, which is treated as a generic OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Anthropic,
    OpenAi,
    OpenRouter,
    Xai,
    Github,
    ZhipuAi,
    Custom,
    Mcp,
    Other(String),
}

/// Groups providers by the wire protocol they speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Anthropic Messages API.
    FirstParty,
    /// `/chat/completions` REST shape.
    OpenAiCompatible,
    /// JSON-RPC `tools/call` bridge.
    Bridge,
}

impl Provider {
    pub fn as_str(&self) -> &str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
            Provider::Xai => "xai",
            Provider::Github => "github",
            Provider::ZhipuAi => "zhipuai",
            Provider::Custom => "custom",
            Provider::Mcp => "mcp",
            Provider::Other(id) => id,
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            Provider::Anthropic => ProviderFamily::FirstParty,
            Provider::Mcp => ProviderFamily::Bridge,
            _ => ProviderFamily::OpenAiCompatible,
        }
    }

    /// Well-known endpoint for OpenAI-compatible vendors. `None` means the
    /// session must supply a base URL.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("https://api.openai.com/v1"),
            Provider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Provider::Xai => Some("https://api.x.ai/v1"),
            Provider::Github => Some("https://models.inference.ai.azure.com"),
            Provider::ZhipuAi => Some("https://open.bigmodel.cn/api/paas/v4"),
            Provider::Mcp => Some(DEFAULT_BRIDGE_URL),
            Provider::Anthropic | Provider::Custom | Provider::Other(_) => None,
        }
    }

    pub fn requires_credential(&self) -> bool {
        self.family() != ProviderFamily::Bridge
    }
}

impl From<&str> for Provider {
    fn from(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Provider::Anthropic,
            "openai" => Provider::OpenAi,
            "openrouter" => Provider::OpenRouter,
            "xai" => Provider::Xai,
            "github" => Provider::Github,
            "zhipuai" => Provider::ZhipuAi,
            "custom" => Provider::Custom,
            "mcp" => Provider::Mcp,
            other => Provider::Other(other.to_string()),
        }
    }
}

impl From<String> for Provider {
    fn from(id: String) -> Self {
        Provider::from(id.as_str())
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.as_str().to_string()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to bind a gateway to one provider for a session.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default, alias = "baseURL")]
    pub base_url: Option<String>,
}

// Keeps the credential out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderConfig {
    /// Returns the non-blank credential, or a configuration error for
    /// providers that need one.
    pub(crate) fn credential(&self) -> Result<String, LlmError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ if self.provider.requires_credential() => Err(LlmError::Config(format!(
                "an API key is required for the {} provider",
                self.provider
            ))),
            _ => Ok(String::new()),
        }
    }

    /// Resolves the endpoint base URL: explicit override first, then the
    /// provider's well-known URL. Trailing slashes are dropped.
    pub(crate) fn resolved_base_url(&self) -> Result<String, LlmError> {
        let raw = match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self
                .provider
                .default_base_url()
                .ok_or_else(|| {
                    LlmError::Config(format!(
                        "a base URL is required for the {} provider",
                        self.provider
                    ))
                })?
                .to_string(),
        };

        Url::parse(&raw)
            .map_err(|e| LlmError::Config(format!("invalid base URL '{raw}': {e}")))?;

        Ok(raw.trim_end_matches('/').to_string())
    }
}

/// Timeouts applied to every outbound call the gateway makes.
#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            health_timeout: Duration::from_secs(5),
        }
    }
}
