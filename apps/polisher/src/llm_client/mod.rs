/// LLM Gateway: the single point of entry for every model call in Polisher.
///
/// A gateway is bound to one provider for its whole lifetime. Switching
/// providers means building a new gateway; there is no reconfiguration.
///
/// Three wire families sit behind one `complete` operation:
/// - Anthropic Messages API (`anthropic`)
/// - OpenAI-compatible chat completions (`openai`, OpenRouter, xAI, GitHub Models, ...)
/// - a local JSON-RPC tool bridge (`bridge`) that cannot stream
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub mod anthropic;
pub mod bridge;
pub mod limits;
pub mod openai;
pub mod pricing;
pub mod prompts;
pub mod provider;
pub mod stream;

pub use provider::{GatewayOptions, Provider, ProviderConfig, ProviderFamily};
pub use stream::{ChunkCallback, EventStream, RawCompletion, StreamEvent, TokenUsage};

/// Max tokens for the connection check prompt.
const VERIFY_MAX_TOKENS: u32 = 10;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM gateway is not initialized")]
    NotInitialized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Bridge error {code}: {message}")]
    Bridge { code: i64, message: String },

    #[error("{operation} is not supported by the {provider} provider")]
    Unsupported {
        operation: &'static str,
        provider: String,
    },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Classifies a reqwest failure, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Http(err)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    #[serde(default)]
    pub streaming: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            streaming: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}

/// Normalized output of one completion, whatever the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One provider family's transport. Implementations decode their own wire
/// shapes into `RawCompletion` / `StreamEvent`; usage fallback and token
/// clamping happen in the gateway.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<RawCompletion, LlmError>;

    async fn stream(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<EventStream, LlmError>;

    /// Cheap connectivity check. Defaults to a tiny completion.
    async fn verify(&self, model: &str) -> Result<(), LlmError> {
        self.complete(model, "test", VERIFY_MAX_TOKENS).await.map(|_| ())
    }
}

struct Session {
    provider: Provider,
    model: String,
    backend: Arc<dyn CompletionBackend>,
}

enum GatewayState {
    Unconfigured,
    Configured(Session),
}

/// Provider-agnostic completion client. Cheap to share behind an `Arc`;
/// holds no mutable state.
pub struct LlmGateway {
    state: GatewayState,
}

impl LlmGateway {
    pub fn unconfigured() -> Self {
        Self {
            state: GatewayState::Unconfigured,
        }
    }

    /// Builds the client for `config`. Validates the configuration but makes
    /// no network calls.
    pub fn connect(config: ProviderConfig, options: GatewayOptions) -> Result<Self, LlmError> {
        if config.model.trim().is_empty() {
            return Err(LlmError::Config("a model id is required".to_string()));
        }

        let backend: Arc<dyn CompletionBackend> = match config.provider.family() {
            ProviderFamily::FirstParty => {
                Arc::new(anthropic::AnthropicClient::from_config(&config, options)?)
            }
            ProviderFamily::OpenAiCompatible => {
                Arc::new(openai::OpenAiClient::from_config(&config, options)?)
            }
            ProviderFamily::Bridge => Arc::new(bridge::BridgeClient::from_config(&config, options)?),
        };

        info!(
            "LLM gateway configured (provider: {}, model: {})",
            config.provider, config.model
        );

        Ok(Self::with_backend(config.provider, config.model, backend))
    }

    pub fn with_backend(
        provider: Provider,
        model: impl Into<String>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            state: GatewayState::Configured(Session {
                provider,
                model: model.into(),
                backend,
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, GatewayState::Configured(_))
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.session().ok().map(|s| &s.provider)
    }

    pub fn model(&self) -> Option<&str> {
        self.session().ok().map(|s| s.model.as_str())
    }

    fn session(&self) -> Result<&Session, LlmError> {
        match &self.state {
            GatewayState::Configured(session) => Ok(session),
            GatewayState::Unconfigured => Err(LlmError::NotInitialized),
        }
    }

    /// Runs one completion. When `request.streaming` is set, `on_chunk` sees
    /// every text delta with the cumulative character count so far.
    /// Transport errors propagate unchanged; nothing is retried.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        on_chunk: Option<ChunkCallback<'_>>,
    ) -> Result<CompletionResult, LlmError> {
        let session = self.session()?;
        let max_tokens = limits::clamp_max_tokens(&session.provider, request.max_tokens);

        debug!(
            "LLM call: provider={}, model={}, max_tokens={}, streaming={}",
            session.provider, session.model, max_tokens, request.streaming
        );

        let result = if request.streaming {
            let events = session
                .backend
                .stream(&session.model, &request.prompt, max_tokens)
                .await?;
            stream::collect_stream(events, &request.prompt, on_chunk).await?
        } else {
            session
                .backend
                .complete(&session.model, &request.prompt, max_tokens)
                .await?
                .into_result(&request.prompt)
        };

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            result.input_tokens, result.output_tokens
        );

        Ok(result)
    }

    /// Sends a minimal request to confirm the credentials and endpoint work.
    pub async fn verify(&self) -> Result<(), LlmError> {
        let session = self.session()?;
        session.backend.verify(&session.model).await
    }

    /// Estimated USD cost of `input_tokens` + `output_tokens` on this session's
    /// provider and model. Zero when unconfigured.
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.session() {
            Ok(s) => pricing::calculate_cost(input_tokens, output_tokens, &s.provider, &s.model),
            Err(_) => 0.0,
        }
    }
}

/// Builds the shared HTTP client for a backend.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(LlmError::Http)
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Turns a non-2xx response into `LlmError::Api`, preferring the provider's
/// own `error.message` over the raw body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map_err(|e| LlmError::from_transport(e, timeout))?;
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    fn gateway(provider: Provider, backend: ScriptedBackend) -> (LlmGateway, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let gateway = LlmGateway::with_backend(provider, "gpt-4o", backend.clone());
        (gateway, backend)
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_rejects_completion() {
        let gateway = LlmGateway::unconfigured();
        assert!(!gateway.is_configured());
        let err = gateway
            .complete(&CompletionRequest::new("hi", 100), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotInitialized));
        assert!(matches!(gateway.verify().await, Err(LlmError::NotInitialized)));
        assert_eq!(gateway.estimate_cost(1000, 1000), 0.0);
    }

    #[tokio::test]
    async fn test_max_tokens_clamped_before_dispatch() {
        let (gateway, backend) = gateway(Provider::Github, ScriptedBackend::text("ok", None));
        gateway
            .complete(&CompletionRequest::new("hi", 16000), None)
            .await
            .unwrap();
        gateway
            .complete(&CompletionRequest::new("hi", 16000).streaming(), None)
            .await
            .unwrap();
        assert_eq!(*backend.seen_max_tokens.lock().unwrap(), vec![4000, 4000]);
    }

    #[tokio::test]
    async fn test_non_streaming_usage_is_estimated_when_absent() {
        let output = "x".repeat(100);
        let (gateway, _) = gateway(Provider::OpenRouter, ScriptedBackend::text(&output, None));
        let result = gateway
            .complete(&CompletionRequest::new("p".repeat(400), 500), None)
            .await
            .unwrap();
        assert_eq!(result.text, output);
        assert_eq!((result.input_tokens, result.output_tokens), (100, 25));
    }

    #[tokio::test]
    async fn test_streaming_invokes_callback_per_delta() {
        let backend = ScriptedBackend::new(
            RawCompletion {
                text: String::new(),
                usage: None,
            },
            vec![
                StreamEvent::TextDelta("Hello".to_string()),
                StreamEvent::TextDelta(", ".to_string()),
                StreamEvent::TextDelta("world".to_string()),
            ],
        );
        let (gateway, _) = gateway(Provider::OpenAi, backend);

        let mut lengths = Vec::new();
        let mut on_chunk = |_: &str, total: usize| lengths.push(total);
        let result = gateway
            .complete(
                &CompletionRequest::new("hi", 100).streaming(),
                Some(&mut on_chunk),
            )
            .await
            .unwrap();

        assert_eq!(result.text, "Hello, world");
        assert_eq!(lengths, vec![5, 7, 12]);
    }

    #[tokio::test]
    async fn test_cost_for_reported_usage() {
        let usage = TokenUsage {
            input_tokens: 500,
            output_tokens: 2000,
        };
        let (gateway, _) = gateway(Provider::OpenAi, ScriptedBackend::text("done", Some(usage)));
        let result = gateway
            .complete(&CompletionRequest::new("hi", 4000), None)
            .await
            .unwrap();
        let cost = gateway.estimate_cost(result.input_tokens as u64, result.output_tokens as u64);
        assert!((cost - (500.0 / 1e6 * 2.5 + 2000.0 / 1e6 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_connect_rejects_blank_model() {
        let config = ProviderConfig {
            provider: Provider::OpenAi,
            model: " ".to_string(),
            api_key: Some("k".to_string()),
            base_url: None,
        };
        let err = LlmGateway::connect(config, GatewayOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn test_connect_binds_provider_and_model() {
        let config = ProviderConfig {
            provider: Provider::from("xai"),
            model: "grok-2".to_string(),
            api_key: Some("k".to_string()),
            base_url: None,
        };
        let gateway = LlmGateway::connect(config, GatewayOptions::default()).unwrap();
        assert!(gateway.is_configured());
        assert_eq!(gateway.provider(), Some(&Provider::Xai));
        assert_eq!(gateway.model(), Some("grok-2"));
    }
}
