use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Diagnostics surface served on the side listener (`:6060`), kept apart
/// from the public API.
pub fn router() -> Router {
    Router::new().route("/debug/status", get(status))
}

async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
