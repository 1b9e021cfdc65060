use axum::extract::State;
use axum::http::StatusCode;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// `GET /ping`: storage reachability probe.
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode> {
    state
        .storage()
        .ping()
        .await
        .map_err(|_| AppError::StorageUnavailable)?;
    Ok(StatusCode::OK)
}
