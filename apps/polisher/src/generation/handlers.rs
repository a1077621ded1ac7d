//! Axum route handlers for the Generation API.

use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::error;

use crate::database::{load_database, ResumeDatabase};
use crate::errors::AppError;
use crate::generation::generator::{generate_tailored_resume, GenerateRequest, GenerateResponse};
use crate::generation::requirements::{
    extract_requirements, ExtractRequirementsRequest, RequirementsResponse,
};
use crate::llm_client::{LlmError, LlmGateway};
use crate::state::AppState;

/// POST /api/v1/requirements/extract
///
/// Summarizes a job posting into requirements markdown.
pub async fn handle_extract_requirements(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequirementsRequest>,
) -> Result<Json<RequirementsResponse>, AppError> {
    let gateway = state.gateway().await;
    let response = extract_requirements(&gateway, request).await?;
    Ok(Json(response))
}

/// Validates the request and loads its database. Everything that can fail
/// before the first model call fails here.
async fn prepare_generation(
    state: &AppState,
    request: &GenerateRequest,
) -> Result<(Arc<LlmGateway>, ResumeDatabase), AppError> {
    if request.requirements.trim().is_empty() {
        return Err(AppError::Validation(
            "requirements cannot be empty".to_string(),
        ));
    }
    if request.template_html.trim().is_empty() {
        return Err(AppError::Validation(
            "template_html cannot be empty".to_string(),
        ));
    }

    let gateway = state.gateway().await;
    if !gateway.is_configured() {
        return Err(LlmError::NotInitialized.into());
    }

    let database = load_database(&request.database_path)
        .await
        .map_err(|e| AppError::Database(format!("{e:#}")))?;

    Ok((gateway, database))
}

/// POST /api/v1/resumes/generate
///
/// Full pipeline: load database → resume completion → recruiter message.
/// The database is read fresh on every call.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let (gateway, database) = prepare_generation(&state, &request).await?;

    let response = generate_tailored_resume(
        &gateway,
        &state.agent_instructions,
        &request,
        &database,
        None,
    )
    .await?;

    Ok(Json(response))
}

/// POST /api/v1/resumes/generate/stream
///
/// Same pipeline as `/generate`, answered as Server-Sent Events:
/// - `chunk`: `{stage, delta, length}` for every streamed delta
/// - `complete`: the final `GenerateResponse`
/// - `error`: `{code, message}` if the pipeline fails after streaming began
///
/// Validation and database errors are returned as plain JSON errors before
/// the stream opens.
pub async fn handle_generate_stream(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let (gateway, database) = prepare_generation(&state, &request).await?;
    let instructions = Arc::clone(&state.agent_instructions);
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        generate_tailored_resume(&gateway, &instructions, &request, &database, Some(&tx)).await
    });

    // The sender lives inside the task, so chunks end before the outcome is read.
    let chunks = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    })
    .map(|chunk| Event::default().event("chunk").json_data(chunk));

    let outcome = stream::once(async move {
        match task.await {
            Ok(Ok(response)) => Event::default().event("complete").json_data(response),
            Ok(Err(e)) => {
                let (_, code, message) = e.parts();
                Event::default()
                    .event("error")
                    .json_data(json!({ "code": code, "message": message }))
            }
            Err(e) => {
                error!("Generation task failed: {e}");
                Event::default().event("error").json_data(json!({
                    "code": "INTERNAL_ERROR",
                    "message": "An internal server error occurred"
                }))
            }
        }
    });

    Ok(Sse::new(chunks.chain(outcome)))
}
