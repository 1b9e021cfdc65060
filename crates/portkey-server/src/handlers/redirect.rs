use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use portkey_core::StorageError;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// `GET /{id}`: 307 with `Location` for a live link, 410 for a
/// tombstoned one, 400 for an unknown id.
pub async fn redirect(Path(id): Path<String>, State(state): State<AppState>) -> Result<Response> {
    let link = state.storage().get_by_short(&id).await.map_err(|e| match e {
        StorageError::NotFound(short) => AppError::UnknownShort(short),
        other => AppError::from_storage(other),
    })?;

    if link.deleted {
        return Err(AppError::Gone);
    }

    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, link.original)],
    )
        .into_response())
}
