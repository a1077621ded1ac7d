use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::pricing::{calculate_cost, lookup_pricing, ModelPricing};
use crate::llm_client::Provider;

#[derive(Debug, Deserialize)]
pub struct CostEstimateRequest {
    pub provider: Provider,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Serialize)]
pub struct CostEstimateResponse {
    pub provider: Provider,
    pub model: String,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cost_usd: f64,
}

/// POST /api/v1/cost/estimate
///
/// Pure price-table lookup; works without an active session.
pub async fn handle_cost_estimate(
    Json(request): Json<CostEstimateRequest>,
) -> Result<Json<CostEstimateResponse>, AppError> {
    if request.model.trim().is_empty() {
        return Err(AppError::Validation("model cannot be empty".to_string()));
    }

    let ModelPricing {
        input_per_million,
        output_per_million,
    } = lookup_pricing(&request.provider, &request.model);
    let cost_usd = calculate_cost(
        request.input_tokens,
        request.output_tokens,
        &request.provider,
        &request.model,
    );

    Ok(Json(CostEstimateResponse {
        provider: request.provider,
        model: request.model,
        input_per_million,
        output_per_million,
        cost_usd,
    }))
}
