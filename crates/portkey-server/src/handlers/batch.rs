use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::info;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::{BatchRequestEntry, BatchResponseEntry};
use crate::state::AppState;

/// `POST /api/shorten/batch`: JSON array of
/// `{correlation_id, original_url}`, inserted atomically. Answers 201
/// with the correlated short URLs.
pub async fn shorten_batch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response> {
    let entries: Vec<BatchRequestEntry> = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed request: {e}")))?;

    let originals: Vec<String> = entries.iter().map(|e| e.original_url.clone()).collect();
    let links = state
        .service()
        .create_batch(&originals, &identity.user_id)
        .await
        .map_err(AppError::from_storage)?;

    let response: Vec<BatchResponseEntry> = entries
        .iter()
        .zip(&links)
        .map(|(entry, link)| BatchResponseEntry {
            correlation_id: entry.correlation_id.clone(),
            short_url: link.to_url(state.base_url()),
        })
        .collect();

    info!(count = response.len(), "batch shortened URLs");
    Ok((StatusCode::CREATED, Json(response)).into_response())
}
