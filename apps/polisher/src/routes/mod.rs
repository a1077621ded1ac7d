pub mod cost;
pub mod health;
pub mod session;

use axum::{
    routing::{get, post},
    Router,
};

use crate::database::handlers as database;
use crate::generation::handlers as generation;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session API
        .route(
            "/api/v1/session",
            get(session::handle_session_status).post(session::handle_configure_session),
        )
        // Generation API
        .route("/api/v1/jobs/scrape", post(jobs::handle_scrape_job))
        .route(
            "/api/v1/requirements/extract",
            post(generation::handle_extract_requirements),
        )
        .route("/api/v1/database/load", post(database::handle_load_database))
        .route("/api/v1/resumes/generate", post(generation::handle_generate))
        .route(
            "/api/v1/resumes/generate/stream",
            post(generation::handle_generate_stream),
        )
        // Cost API
        .route("/api/v1/cost/estimate", post(cost::handle_cost_estimate))
        .with_state(state)
}
