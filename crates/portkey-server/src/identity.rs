use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use portkey_auth::{mint_user_id, TOKEN_TTL_SECS};
use tracing::{debug, error};

use crate::state::AppState;

/// Name of the identity cookie.
pub const COOKIE_NAME: &str = "token";

/// The caller's identity, attached to every request by the middleware.
///
/// `minted` marks an identity created on this very request: the caller
/// arrived without a verifiable token. The user-scoped endpoints treat a
/// minted identity as anonymous.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub minted: bool,
}

impl Identity {
    /// True when the caller presented a valid pre-existing token.
    pub fn is_authenticated(&self) -> bool {
        !self.minted && !self.user_id.is_empty()
    }
}

/// Binds every request to a stable user identity.
///
/// A verifiable `token` cookie yields its embedded user id; anything else
/// mints a fresh uuid, issues a token, and sets the cookie. The request
/// is never refused for a missing or invalid token; the only failure mode
/// is a signing error, which is a 500.
pub async fn identity_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        match state.keys().verify(cookie.value()) {
            Ok(user_id) => {
                request.extensions_mut().insert(Identity {
                    user_id,
                    minted: false,
                });
                return next.run(request).await;
            }
            Err(e) => debug!(error = %e, "identity token rejected, minting a new one"),
        }
    }

    let user_id = mint_user_id();
    let token = match state.keys().issue(&user_id) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "failed to issue identity token");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    request.extensions_mut().insert(Identity {
        user_id,
        minted: true,
    });

    let cookie = Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(TOKEN_TTL_SECS as i64))
        .build();

    (jar.add(cookie), next.run(request).await).into_response()
}
