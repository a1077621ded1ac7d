//! Anthropic Messages API backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::stream::{self, EventStream, RawCompletion, StreamEvent, TokenUsage};
use super::{ensure_success, http_client, CompletionBackend, GatewayOptions, LlmError, ProviderConfig};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseEvent {
    MessageStart { message: StartMessage },
    ContentBlockDelta { delta: BlockDelta },
    MessageDelta { usage: Option<Usage> },
    Error { error: StreamErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StartMessage {
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

impl MessagesResponse {
    fn normalize(self) -> RawCompletion {
        let text = self
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect::<String>();
        RawCompletion {
            text,
            usage: self.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

/// Decodes one `data:` payload of a Messages stream.
pub fn decode_event(payload: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let event = match serde_json::from_str::<SseEvent>(payload)? {
        SseEvent::MessageStart { message } => StreamEvent::InputTokens(message.usage.input_tokens),
        SseEvent::ContentBlockDelta {
            delta: BlockDelta::TextDelta { text },
        } => StreamEvent::TextDelta(text),
        SseEvent::MessageDelta { usage: Some(usage) } => {
            StreamEvent::OutputTokens(usage.output_tokens)
        }
        SseEvent::Error { error } => {
            return Err(LlmError::Api {
                status: stream_error_status(&error.error_type),
                message: format!("{}: {}", error.error_type, error.message),
            })
        }
        _ => return Ok(Vec::new()),
    };
    Ok(vec![event])
}

/// Errors inside a 200 stream carry only a type; map it back to the status
/// the same failure gets outside a stream.
fn stream_error_status(error_type: &str) -> u16 {
    match error_type {
        "invalid_request_error" => 400,
        "authentication_error" => 401,
        "permission_error" => 403,
        "not_found_error" => 404,
        "rate_limit_error" => 429,
        "overloaded_error" => 529,
        _ => 500,
    }
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn from_config(config: &ProviderConfig, options: GatewayOptions) -> Result<Self, LlmError> {
        if config.base_url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
            warn!("Ignoring base URL override for anthropic; the Messages endpoint is fixed");
        }
        Self::with_endpoint(config.credential()?, ANTHROPIC_API_URL, options)
    }

    pub(crate) fn with_endpoint(
        api_key: String,
        endpoint: impl Into<String>,
        options: GatewayOptions,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(options.request_timeout)?,
            api_key,
            endpoint: endpoint.into(),
            timeout: options.request_timeout,
        })
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        ensure_success(response, self.timeout).await
    }
}

#[async_trait]
impl CompletionBackend for AnthropicClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<RawCompletion, LlmError> {
        let body = MessagesRequest {
            model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response: MessagesResponse = self
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
        let body = MessagesRequest {
            model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let response = self.send(&body).await?;
        Ok(stream::sse_events(response, decode_event, self.timeout))
    }
}
