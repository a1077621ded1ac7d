use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{LlmGateway, Provider, ProviderConfig};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfigureSessionRequest {
    #[serde(flatten)]
    pub config: ProviderConfig,
    /// Verify the provider before installing the gateway.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub configured: bool,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub verified: Option<bool>,
}

impl SessionStatus {
    fn of(gateway: &LlmGateway, verified: Option<bool>) -> Self {
        Self {
            configured: gateway.is_configured(),
            provider: gateway.provider().cloned(),
            model: gateway.model().map(str::to_string),
            verified,
        }
    }
}

/// GET /api/v1/session
pub async fn handle_session_status(State(state): State<AppState>) -> Json<SessionStatus> {
    let gateway = state.gateway().await;
    Json(SessionStatus::of(&gateway, None))
}

/// POST /api/v1/session
///
/// Builds a gateway for the posted provider, optionally verifies it, then
/// replaces the active one. A failed check leaves the previous session in place.
pub async fn handle_configure_session(
    State(state): State<AppState>,
    Json(request): Json<ConfigureSessionRequest>,
) -> Result<Json<SessionStatus>, AppError> {
    let gateway = LlmGateway::connect(request.config, state.config.gateway)?;

    if request.verify {
        gateway.verify().await?;
        info!("LLM session verified");
    }

    let status = SessionStatus::of(&gateway, Some(request.verify));
    state.replace_gateway(gateway).await;
    Ok(Json(status))
}
