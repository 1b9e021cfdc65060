use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::info;

use crate::deleter;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::UserUrl;
use crate::state::AppState;

/// `GET /api/user/urls`: the caller's links. 401 for anonymous callers,
/// 204 when the list is empty.
pub async fn list_user_urls(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response> {
    if !identity.is_authenticated() {
        return Err(AppError::Unauthorized);
    }

    let links = state
        .storage()
        .list_by_user(&identity.user_id)
        .await
        .map_err(AppError::from_storage)?;

    if links.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let urls: Vec<UserUrl> = links
        .into_iter()
        .map(|link| UserUrl {
            short_url: link.to_url(state.base_url()),
            original_url: link.original,
        })
        .collect();

    Ok((StatusCode::OK, Json(urls)).into_response())
}

/// `DELETE /api/user/urls`: JSON array of shorts to tombstone. The
/// pipeline drains before the 202 goes out, but produces no per-item
/// status; cross-user entries are silently refused by the storage.
pub async fn delete_user_urls(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response> {
    if !identity.is_authenticated() {
        return Err(AppError::Unauthorized);
    }

    let shorts: Vec<String> = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed request: {e}")))?;

    let marked = deleter::delete_user_urls(
        state.storage().clone(),
        identity.user_id.clone(),
        shorts,
        state.shutdown(),
    )
    .await;

    info!(user_id = %identity.user_id, marked, "processed deletion request");
    Ok(StatusCode::ACCEPTED.into_response())
}
