use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::identity;
use crate::state::AppState;
use crate::subnet;

/// Assembles the HTTP surface.
///
/// Requests flow tracing -> gzip codec -> identity -> handler; the stats
/// route additionally sits behind the trusted-subnet guard.
pub fn router(state: AppState) -> Router {
    let stats = Router::new()
        .route("/api/internal/stats", get(handlers::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            subnet::trusted_subnet_guard,
        ));

    Router::new()
        .route("/", post(handlers::shorten_text))
        .route("/api/shorten", post(handlers::shorten_json))
        .route("/api/shorten/batch", post(handlers::shorten_batch))
        .route(
            "/api/user/urls",
            get(handlers::list_user_urls).delete(handlers::delete_user_urls),
        )
        .route("/ping", get(handlers::ping))
        .route("/{id}", get(handlers::redirect))
        .merge(stats)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::identity_middleware,
        ))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
