use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token lifetime: 3 hours.
pub const TOKEN_TTL_SECS: u64 = 3 * 60 * 60;

// Process-wide signing secret. Deployments that care should replace it via
// TokenKeys::new with a value from the environment or a secret store.
const DEFAULT_SECRET: &[u8] = b"p0rtkey-signing-secret";

/// Errors produced by token verification and issuance.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// JWT claims carried by the identity cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The embedded user id.
    pub sub: String,
    /// Expiry as a unix timestamp, seconds.
    pub exp: u64,
}

/// HMAC key pair used to issue and verify identity tokens.
///
/// Verification is pinned to HS256; tokens signed with any other
/// algorithm are rejected as invalid.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    /// Builds keys from an explicit secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issues a signed token embedding `user_id`, expiring in
    /// [`TOKEN_TTL_SECS`].
    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: jsonwebtoken::get_current_timestamp() + TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature and expiry, returning the embedded user id.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        Ok(data.claims.sub)
    }
}

impl Default for TokenKeys {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET)
    }
}

/// Mints a fresh opaque user id (UUID v4 form).
pub fn mint_user_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips_user_id() {
        let keys = TokenKeys::default();
        let user_id = mint_user_id();

        let token = keys.issue(&user_id).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn token_is_compact_three_part_form() {
        let keys = TokenKeys::default();
        let token = keys.issue("u1").unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(token.chars().all(|c| c.is_ascii_graphic()));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = TokenKeys::default();
        assert!(matches!(keys.verify("not-a-token"), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let ours = TokenKeys::default();
        let theirs = TokenKeys::new(b"some-other-secret");

        let token = theirs.issue("u1").unwrap();
        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_rejects_unexpected_algorithm() {
        let keys = TokenKeys::default();

        // Same secret, wrong algorithm: verification is pinned to HS256.
        let claims = Claims {
            sub: "u1".to_string(),
            exp: jsonwebtoken::get_current_timestamp() + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(DEFAULT_SECRET),
        )
        .unwrap();

        assert!(matches!(keys.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = TokenKeys::default();

        // Well past the default validation leeway.
        let claims = Claims {
            sub: "u1".to_string(),
            exp: jsonwebtoken::get_current_timestamp() - 120,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(DEFAULT_SECRET),
        )
        .unwrap();

        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn minted_user_ids_are_unique_uuids() {
        let a = mint_user_id();
        let b = mint_user_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
