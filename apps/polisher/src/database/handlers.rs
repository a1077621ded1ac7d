use std::path::PathBuf;

use axum::Json;
use serde::Deserialize;

use crate::database::{load_database, DatabaseSummary};
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct LoadDatabaseRequest {
    pub path: PathBuf,
}

/// POST /api/v1/database/load
///
/// Validates a database directory and reports what it contains.
pub async fn handle_load_database(
    Json(request): Json<LoadDatabaseRequest>,
) -> Result<Json<DatabaseSummary>, AppError> {
    if request.path.as_os_str().is_empty() {
        return Err(AppError::Validation("path cannot be empty".to_string()));
    }

    let database = load_database(&request.path)
        .await
        .map_err(|e| AppError::Database(format!("{e:#}")))?;

    Ok(Json(database.summary()))
}
