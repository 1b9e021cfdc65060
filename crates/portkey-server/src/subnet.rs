use std::net::IpAddr;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::state::AppState;

/// Header carrying the client address, set by the fronting proxy.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Restricts the wrapped route to the configured trusted subnet.
///
/// No configured CIDR, a missing or unparsable `X-Real-IP`, or an address
/// outside the subnet all answer 403 with a textual body. The CIDR is
/// parsed once at startup; this guard only checks membership.
pub async fn trusted_subnet_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(subnet) = state.trusted_subnet() else {
        return forbidden("access forbidden");
    };

    let Some(raw) = request
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return forbidden("X-Real-IP header required");
    };

    let Ok(ip) = raw.parse::<IpAddr>() else {
        warn!(raw, "unparsable X-Real-IP");
        return forbidden("invalid IP address");
    };

    if !subnet.contains(&ip) {
        return forbidden("access forbidden");
    }

    next.run(request).await
}

fn forbidden(message: &'static str) -> Response {
    (StatusCode::FORBIDDEN, message).into_response()
}
