//! Resume Generation: orchestrates the tailoring pipeline.
//!
//! Flow: database summary → resume prompt → streamed resume completion →
//!       HTML extraction → streamed recruiter message → usage + cost.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, trace, warn};
use uuid::Uuid;

use crate::database::{display_entry, ResumeDatabase};
use crate::errors::AppError;
use crate::generation::html::extract_html_document;
use crate::generation::prompts::{
    DEFAULT_AGENT_INSTRUCTIONS, RECRUITER_MESSAGE_PROMPT_TEMPLATE, RESUME_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{render, HTML_DOCUMENT_INSTRUCTION, SPELLING_INSTRUCTION};
use crate::llm_client::{CompletionRequest, CompletionResult, LlmError, LlmGateway};

pub const RESUME_MAX_TOKENS: u32 = 16000;
pub const RECRUITER_MESSAGE_MAX_TOKENS: u32 = 1000;

/// How much of each index goes into the prompt.
const TOP_ACHIEVEMENTS_LIMIT: usize = 20;
const PRIMARY_SKILLS_LIMIT: usize = 30;
const TECHNOLOGIES_LIMIT: usize = 40;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub requirements: String,
    pub template_html: String,
    pub database_path: PathBuf,
}

/// Token usage and estimated cost across every call in a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

impl UsageSummary {
    pub fn from_results(gateway: &LlmGateway, results: &[&CompletionResult]) -> Self {
        let input_tokens: u64 = results.iter().map(|r| r.input_tokens as u64).sum();
        let output_tokens: u64 = results.iter().map(|r| r.output_tokens as u64).sum();
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost_usd: gateway.estimate_cost(input_tokens, output_tokens),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub generation_id: Uuid,
    pub tailored_html: String,
    pub recruiter_message: String,
    pub generated_at: DateTime<Utc>,
    pub usage: UsageSummary,
}

/// One streamed text delta, forwarded to live listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkProgress {
    pub stage: &'static str,
    pub delta: String,
    /// Characters received so far in this stage.
    pub length: usize,
}

pub type ProgressSender = UnboundedSender<ChunkProgress>;

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

fn numbered_list(entries: &[serde_json::Value], limit: usize) -> String {
    entries
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, entry)| format!("{}. {}", i + 1, display_entry(entry)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn comma_list(entries: &[serde_json::Value], limit: usize) -> String {
    entries
        .iter()
        .take(limit)
        .map(display_entry)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_resume_prompt(
    agent_instructions: &str,
    requirements: &str,
    template_html: &str,
    database: &ResumeDatabase,
) -> String {
    let index = &database.index;
    let achievements = numbered_list(
        &index.query_paths.get_top_achievements_by_impact,
        TOP_ACHIEVEMENTS_LIMIT,
    );
    let skills = comma_list(&index.indices.skills.primary, PRIMARY_SKILLS_LIMIT);
    let technologies = comma_list(&index.indices.technologies, TECHNOLOGIES_LIMIT);
    let roles = index
        .lookup_tables
        .role_by_company
        .iter()
        .map(|(company, roles)| format!("- {company}: {}", comma_list(roles, roles.len())))
        .collect::<Vec<_>>()
        .join("\n");

    render(
        RESUME_PROMPT_TEMPLATE,
        &[
            ("agent_instructions", agent_instructions),
            ("requirements", requirements),
            ("template_html", template_html),
            ("achievements", achievements.as_str()),
            ("skills", skills.as_str()),
            ("technologies", technologies.as_str()),
            ("roles", roles.as_str()),
            ("spelling", SPELLING_INSTRUCTION),
            ("output_format", HTML_DOCUMENT_INSTRUCTION),
        ],
    )
}

pub fn build_recruiter_prompt(requirements: &str) -> String {
    render(
        RECRUITER_MESSAGE_PROMPT_TEMPLATE,
        &[
            ("requirements", requirements),
            ("spelling", SPELLING_INSTRUCTION),
        ],
    )
}

/// Reads agent instructions from `path`, falling back to the built-in set
/// when no path is configured or the file cannot be read.
pub async fn load_agent_instructions(path: Option<&Path>) -> String {
    let Some(path) = path else {
        info!("Using default agent instructions");
        return DEFAULT_AGENT_INSTRUCTIONS.to_string();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => {
            info!("Loaded agent instructions from {}", path.display());
            content
        }
        Ok(_) => {
            warn!("Agent instructions file {} is empty; using defaults", path.display());
            DEFAULT_AGENT_INSTRUCTIONS.to_string()
        }
        Err(e) => {
            warn!(
                "Could not read agent instructions {}: {e}; using defaults",
                path.display()
            );
            DEFAULT_AGENT_INSTRUCTIONS.to_string()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Streams a completion, logging progress as deltas arrive. Providers that
/// cannot stream get a single non-streaming call instead.
async fn complete_with_progress(
    gateway: &LlmGateway,
    stage: &'static str,
    prompt: String,
    max_tokens: u32,
    progress: Option<&ProgressSender>,
) -> Result<CompletionResult, LlmError> {
    let request = CompletionRequest::new(prompt, max_tokens).streaming();
    let mut on_chunk = |delta: &str, total: usize| {
        trace!("{stage}: streamed {total} chars");
        if let Some(tx) = progress {
            // A closed receiver means the listener went away; generation still finishes.
            let _ = tx.send(ChunkProgress {
                stage,
                delta: delta.to_string(),
                length: total,
            });
        }
    };

    let result = gateway.complete(&request, Some(&mut on_chunk)).await;
    match result {
        Err(LlmError::Unsupported { provider, .. }) => {
            info!("{provider} cannot stream; requesting {stage} without streaming");
            let request = CompletionRequest {
                streaming: false,
                ..request
            };
            gateway.complete(&request, None).await
        }
        other => other,
    }
}

/// Runs the tailoring pipeline against an already loaded database.
/// Every streamed delta is also sent to `progress` when one is given.
///
/// Steps:
/// 1. build the resume prompt from instructions, requirements, template, database
/// 2. stream the resume completion and extract the HTML document
/// 3. stream the recruiter message
/// 4. total the usage of both calls and estimate cost
pub async fn generate_tailored_resume(
    gateway: &LlmGateway,
    agent_instructions: &str,
    request: &GenerateRequest,
    database: &ResumeDatabase,
    progress: Option<&ProgressSender>,
) -> Result<GenerateResponse, AppError> {
    let generation_id = Uuid::new_v4();
    info!(
        "Generation {generation_id}: provider={}, model={}",
        gateway.provider().map(|p| p.as_str()).unwrap_or("none"),
        gateway.model().unwrap_or("none")
    );

    // Step 1-2: Resume
    let prompt = build_resume_prompt(
        agent_instructions,
        &request.requirements,
        &request.template_html,
        database,
    );
    let resume =
        complete_with_progress(gateway, "resume", prompt, RESUME_MAX_TOKENS, progress).await?;
    info!(
        "Generation {generation_id}: resume response received ({} characters)",
        resume.text.chars().count()
    );

    if resume.text.trim().is_empty() {
        return Err(AppError::Llm(LlmError::EmptyContent));
    }
    let tailored_html = extract_html_document(&resume.text);

    // Step 3: Recruiter message
    let message = complete_with_progress(
        gateway,
        "recruiter message",
        build_recruiter_prompt(&request.requirements),
        RECRUITER_MESSAGE_MAX_TOKENS,
        progress,
    )
    .await?;

    // Step 4: Usage
    let usage = UsageSummary::from_results(gateway, &[&resume, &message]);
    info!(
        "Generation {generation_id} complete: {} tokens, est. ${:.4}",
        usage.total_tokens, usage.cost_usd
    );

    Ok(GenerateResponse {
        generation_id,
        tailored_html,
        recruiter_message: message.text.trim().to_string(),
        generated_at: Utc::now(),
        usage,
    })
}
