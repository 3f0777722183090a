//! Verification of the identity provider's signed ID tokens.

mod jwt;

pub use jwt::{Claims, TokenVerifier};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}
