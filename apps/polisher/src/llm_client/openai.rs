//! OpenAI-compatible `/chat/completions` backend.
//!
//! Serves every vendor that speaks this shape (OpenAI, OpenRouter, xAI,
//! GitHub Models, ZhipuAI, self-hosted) by pointing the base URL elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::stream::{self, EventStream, RawCompletion, StreamEvent, TokenUsage};
use super::{
    ensure_success, http_client, CompletionBackend, GatewayOptions, LlmError, Provider,
    ProviderConfig,
};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(u: Usage) -> Self {
        TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    message: String,
}

impl ChatResponse {
    fn normalize(self) -> RawCompletion {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        RawCompletion {
            text,
            usage: self.usage.map(TokenUsage::from),
        }
    }
}

/// Decodes one `data:` payload of a chat-completions stream. Usage usually
/// rides on the final chunk, when the vendor sends it at all.
pub fn decode_chunk(payload: &str) -> Result<Vec<StreamEvent>, LlmError> {
    if payload.trim() == DONE_SENTINEL {
        return Ok(Vec::new());
    }

    let chunk: ChatChunk = serde_json::from_str(payload)?;
    if let Some(error) = chunk.error {
        let status = error
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        return Err(LlmError::Api {
            status,
            message: error.message,
        });
    }

    let mut events: Vec<StreamEvent> = chunk
        .choices
        .into_iter()
        .take(1)
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .filter(|text| !text.is_empty())
        .map(StreamEvent::TextDelta)
        .collect();

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage.into()));
    }

    Ok(events)
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    request_usage_in_stream: bool,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn from_config(config: &ProviderConfig, options: GatewayOptions) -> Result<Self, LlmError> {
        let base_url = config.resolved_base_url()?;
        Ok(Self {
            client: http_client(options.request_timeout)?,
            api_key: config.credential()?,
            endpoint: format!("{base_url}/chat/completions"),
            // Other vendors may reject the field; they get usage estimated instead.
            request_usage_in_stream: config.provider == Provider::OpenAi,
            timeout: options.request_timeout,
        })
    }

    fn request<'a>(
        &self,
        model: &'a str,
        prompt: &'a str,
        max_tokens: u32,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model,
            max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream,
            stream_options: (stream && self.request_usage_in_stream)
                .then_some(StreamOptions { include_usage: true }),
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        ensure_success(response, self.timeout).await
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<RawCompletion, LlmError> {
        let body = self.request(model, prompt, max_tokens, false);
        let response: ChatResponse = self
            .send(&body)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        Ok(response.normalize())
    }

    async fn stream(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<EventStream, LlmError> {
        let body = self.request(model, prompt, max_tokens, true);
        let response = self.send(&body).await?;
        Ok(stream::sse_events(response, decode_chunk, self.timeout))
    }
}
