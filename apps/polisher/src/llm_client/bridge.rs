//! Local tool-execution bridge reached over JSON-RPC 2.0.
//!
//! Each completion is a single `tools/call` to the bridge's code-execution
//! tool. The bridge reports no token usage and cannot stream.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::stream::{EventStream, RawCompletion};
use super::{
    ensure_success, http_client, CompletionBackend, GatewayOptions, LlmError, ProviderConfig,
};

const BRIDGE_TOOL: &str = "claude_code_execute";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: ToolCallParams<'a>,
    id: i64,
}

#[derive(Debug, Serialize)]
struct ToolCallParams<'a> {
    name: &'static str,
    arguments: ToolArguments<'a>,
}

#[derive(Debug, Serialize)]
struct ToolArguments<'a> {
    command: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Pulls the output text out of a `tools/call` result. Accepts a bare
/// string, `{ "output": "..." }`, or MCP `{ "content": [{ "type": "text", ... }] }`.
fn result_text(result: Value) -> String {
    match result {
        Value::String(s) => s,
        Value::Object(mut map) => {
            if let Some(Value::String(output)) = map.remove("output") {
                return output;
            }
            if let Some(Value::Array(blocks)) = map.get("content") {
                let text: String = blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect();
                if !text.is_empty() {
                    return text;
                }
            }
            Value::Object(map).to_string()
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl BridgeClient {
    pub fn from_config(config: &ProviderConfig, options: GatewayOptions) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(options.request_timeout)?,
            base_url: config.resolved_base_url()?,
            timeout: options.request_timeout,
            health_timeout: options.health_timeout,
        })
    }
}

#[async_trait]
impl CompletionBackend for BridgeClient {
    async fn complete(
        &self,
        _model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<RawCompletion, LlmError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "tools/call",
            params: ToolCallParams {
                name: BRIDGE_TOOL,
                arguments: ToolArguments {
                    command: prompt,
                    max_tokens,
                },
            },
            id: chrono::Utc::now().timestamp_millis(),
        };

        let response = self
            .client
            .post(format!("{}/mcp", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        let reply: RpcResponse = ensure_success(response, self.timeout)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        if let Some(error) = reply.error {
            return Err(LlmError::Bridge {
                code: error.code,
                message: error.message,
            });
        }

        Ok(RawCompletion {
            text: result_text(reply.result.unwrap_or(Value::Null)),
            usage: None,
        })
    }

    async fn stream(
        &self,
        _model: &str,
        _prompt: &str,
        _max_tokens: u32,
    ) -> Result<EventStream, LlmError> {
        Err(LlmError::Unsupported {
            operation: "streaming",
            provider: "mcp".to_string(),
        })
    }

    async fn verify(&self, _model: &str) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.health_timeout))?;

        ensure_success(response, self.health_timeout).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::llm_client::testing::spawn_server;
    use crate::llm_client::{CompletionRequest, LlmGateway, Provider};

    async fn mcp(Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "tools/call");
        assert_eq!(body["params"]["name"], BRIDGE_TOOL);

        let command = body["params"]["arguments"]["command"].as_str().unwrap_or_default();
        if command == "fail" {
            return Json(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32603, "message": "tool crashed"},
                "id": body["id"]
            }));
        }
        Json(json!({
            "jsonrpc": "2.0",
            "result": {"output": "o".repeat(100)},
            "id": body["id"]
        }))
    }

    async fn gateway(router: Router) -> LlmGateway {
        let addr = spawn_server(router).await;
        let config = ProviderConfig {
            provider: Provider::Mcp,
            model: "bridge".to_string(),
            api_key: None,
            base_url: Some(format!("http://{addr}")),
        };
        LlmGateway::connect(config, GatewayOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_tool_call_result_maps_to_completion_with_estimated_usage() {
        let gateway = gateway(Router::new().route("/mcp", post(mcp))).await;
        let result = gateway
            .complete(&CompletionRequest::new("p".repeat(400), 1000), None)
            .await
            .unwrap();
        assert_eq!(result.text.len(), 100);
        assert_eq!((result.input_tokens, result.output_tokens), (100, 25));
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces_as_bridge_error() {
        let gateway = gateway(Router::new().route("/mcp", post(mcp))).await;
        let err = gateway
            .complete(&CompletionRequest::new("fail", 10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Bridge { code: -32603, .. }));
    }

    #[tokio::test]
    async fn test_streaming_is_rejected_as_unsupported() {
        // No server: the rejection must happen before any network traffic.
        let config = ProviderConfig {
            provider: Provider::Mcp,
            model: "bridge".to_string(),
            api_key: None,
            base_url: Some("http://127.0.0.1:9".to_string()),
        };
        let gateway = LlmGateway::connect(config, GatewayOptions::default()).unwrap();

        let mut calls = 0;
        let mut on_chunk = |_: &str, _: usize| calls += 1;
        let err = gateway
            .complete(
                &CompletionRequest::new("hi", 10).streaming(),
                Some(&mut on_chunk),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LlmError::Unsupported {
                operation: "streaming",
                ..
            }
        ));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_verify_uses_health_endpoint() {
        let healthy = gateway(Router::new().route("/health", get(|| async { "ok" }))).await;
        healthy.verify().await.unwrap();

        let unhealthy = gateway(Router::new().route(
            "/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        assert!(matches!(
            unhealthy.verify().await,
            Err(LlmError::Api { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_health_check_times_out_with_health_timeout() {
        let addr = spawn_server(Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                "ok"
            }),
        ))
        .await;
        let config = ProviderConfig {
            provider: Provider::Mcp,
            model: "bridge".to_string(),
            api_key: None,
            base_url: Some(format!("http://{addr}")),
        };
        let options = GatewayOptions {
            health_timeout: Duration::from_millis(150),
            ..GatewayOptions::default()
        };
        let gateway = LlmGateway::connect(config, options).unwrap();

        let err = gateway.verify().await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(t) if t == Duration::from_millis(150)));
    }

    #[test]
    fn test_result_text_shapes() {
        assert_eq!(result_text(json!("plain")), "plain");
        assert_eq!(result_text(json!({"output": "out"})), "out");
        assert_eq!(
            result_text(json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]})),
            "ab"
        );
        assert_eq!(result_text(Value::Null), "");
    }
}
