//! Requirements extraction: turns raw job-posting text into a markdown
//! summary of the role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::generation::generator::UsageSummary;
use crate::generation::prompts::REQUIREMENTS_PROMPT_TEMPLATE;
use crate::llm_client::prompts::render;
use crate::llm_client::{CompletionRequest, LlmGateway};

pub const REQUIREMENTS_MAX_TOKENS: u32 = 16000;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequirementsRequest {
    #[serde(default)]
    pub job_url: Option<String>,
    pub page_content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequirementsMetadata {
    pub job_url: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequirementsResponse {
    pub requirements: String,
    pub metadata: RequirementsMetadata,
    pub usage: UsageSummary,
}

pub fn build_requirements_prompt(page_content: &str) -> String {
    render(REQUIREMENTS_PROMPT_TEMPLATE, &[("page_content", page_content)])
}

/// Extracts structured requirements from a job posting in one
/// non-streaming completion.
pub async fn extract_requirements(
    gateway: &LlmGateway,
    request: ExtractRequirementsRequest,
) -> Result<RequirementsResponse, AppError> {
    if request.page_content.trim().is_empty() {
        return Err(AppError::Validation(
            "page_content cannot be empty".to_string(),
        ));
    }

    let prompt = build_requirements_prompt(&request.page_content);
    let result = gateway
        .complete(
            &CompletionRequest::new(prompt, REQUIREMENTS_MAX_TOKENS),
            None,
        )
        .await?;

    info!(
        "Requirements extracted for {}: {} characters",
        request.job_url.as_deref().unwrap_or("<inline posting>"),
        result.text.chars().count()
    );

    let usage = UsageSummary::from_results(gateway, &[&result]);
    Ok(RequirementsResponse {
        requirements: result.text,
        metadata: RequirementsMetadata {
            job_url: request.job_url,
            extracted_at: Utc::now(),
        },
        usage,
    })
}
