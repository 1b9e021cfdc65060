//! Signed identity tokens for the portkey URL shortener.
//!
//! Identity has no server-side state: a user id is minted once, embedded
//! in an HMAC-signed token, and reconstructed from that token on every
//! request.

pub mod token;

pub use token::{mint_user_id, Claims, TokenError, TokenKeys, TOKEN_TTL_SECS};
