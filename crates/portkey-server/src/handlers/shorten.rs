use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::info;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::{ShortenRequest, ShortenResponse};
use crate::service::CreateOutcome;
use crate::state::AppState;

fn status_for(outcome: &CreateOutcome) -> StatusCode {
    if outcome.is_existing() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// `POST /`: the body is the raw URL, the response the plain-text short
/// URL. 201 on creation, 409 with the pre-existing short URL on a
/// duplicate original.
pub async fn shorten_text(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response> {
    if body.is_empty() {
        return Err(AppError::BadRequest("empty request body".into()));
    }

    let outcome = state
        .service()
        .create(&body, &identity.user_id)
        .await
        .map_err(AppError::from_storage)?;

    info!(short = %outcome.link().short, existing = outcome.is_existing(), "shortened URL");
    Ok((status_for(&outcome), outcome.link().to_url(state.base_url())).into_response())
}

/// `POST /api/shorten`: JSON body `{"url": ...}`, response
/// `{"result": <short url>}`. Same insert path and conflict policy as
/// the plain-text endpoint.
pub async fn shorten_json(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response> {
    let request: ShortenRequest = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed request: {e}")))?;
    if request.url.is_empty() {
        return Err(AppError::BadRequest("empty url".into()));
    }

    let outcome = state
        .service()
        .create(&request.url, &identity.user_id)
        .await
        .map_err(AppError::from_storage)?;

    let response = ShortenResponse {
        result: outcome.link().to_url(state.base_url()),
    };
    Ok((status_for(&outcome), Json(response)).into_response())
}
