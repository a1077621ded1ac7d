use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeJobRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeJobResponse {
    pub url: String,
    pub content: String,
    pub scraped_at: DateTime<Utc>,
}

/// POST /api/v1/jobs/scrape
///
/// Fetches a job posting and returns its text, ready for
/// `/api/v1/requirements/extract`.
pub async fn handle_scrape_job(
    State(state): State<AppState>,
    Json(request): Json<ScrapeJobRequest>,
) -> Result<Json<ScrapeJobResponse>, AppError> {
    if request.url.trim().is_empty() {
        return Err(AppError::Validation("url cannot be empty".to_string()));
    }

    let content = state.scraper.scrape(&request.url).await?;

    Ok(Json(ScrapeJobResponse {
        url: request.url,
        content,
        scraped_at: Utc::now(),
    }))
}
