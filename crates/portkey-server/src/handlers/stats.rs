use axum::extract::State;
use axum::Json;

use crate::error::{AppError, Result};
use crate::model::StatsResponse;
use crate::state::AppState;

/// `GET /api/internal/stats`: aggregate counters. The trusted-subnet
/// guard wraps this route; the handler itself is network-agnostic.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state
        .storage()
        .stats()
        .await
        .map_err(AppError::from_storage)?;

    Ok(Json(StatsResponse {
        urls: stats.urls,
        users: stats.users,
    }))
}
