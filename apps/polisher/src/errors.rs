use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::jobs::ScrapeError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Job scraping error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Resume database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(e) => llm_error_parts(e),
            AppError::Scrape(e) => scrape_error_parts(e),
            AppError::Database(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DATABASE_ERROR",
                msg.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn llm_error_parts(e: &LlmError) -> (StatusCode, &'static str, String) {
    let (status, code) = match e {
        LlmError::NotInitialized => (StatusCode::CONFLICT, "LLM_NOT_INITIALIZED"),
        LlmError::Config(_) => (StatusCode::BAD_REQUEST, "LLM_CONFIG_ERROR"),
        LlmError::Unsupported { .. } => (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED_OPERATION"),
        LlmError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "LLM_TIMEOUT"),
        LlmError::Http(_)
        | LlmError::Api { .. }
        | LlmError::Parse(_)
        | LlmError::Bridge { .. }
        | LlmError::EmptyContent => {
            tracing::error!("LLM error: {e}");
            (StatusCode::BAD_GATEWAY, "LLM_ERROR")
        }
    };
    (status, code, e.to_string())
}

fn scrape_error_parts(e: &ScrapeError) -> (StatusCode, &'static str, String) {
    let status = match e {
        ScrapeError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Http(_) | ScrapeError::Status { .. } => StatusCode::BAD_GATEWAY,
        ScrapeError::Selector(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, "SCRAPE_ERROR", e.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
