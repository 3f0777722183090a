use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::AuthError;
use crate::config::AuthConfig;

/// ID token claims. `sub` is the identity-provider uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// HS256 verifier for tokens minted with the secret shared with the
/// identity provider.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), &config.issuer, &config.audience)
    }

    /// Mint a token for `uid`, valid for `ttl`.
    pub fn issue(&self, uid: &str, email: Option<&str>, ttl: Duration) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: uid.to_string(),
            email: email.map(str::to_string),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Check signature, issuer, audience and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }
        Ok(data.claims)
    }

    /// Token from an `Authorization: Bearer ...` header value.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(b"test-secret-key-with-at-least-32-bytes", "eventos-identity", "eventos-api")
    }

    #[test]
    fn test_issue_and_verify() {
        let verifier = verifier();
        let token = verifier.issue("uid-1", Some("ana@example.com"), Duration::hours(1)).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "uid-1");
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_expired_token() {
        let verifier = verifier();
        let token = verifier.issue("uid-1", None, Duration::hours(-2)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_or_audience() {
        let other = TokenVerifier::new(b"another-secret-key-with-32-bytes-or-more", "eventos-identity", "eventos-api");
        let token = other.issue("uid-1", None, Duration::hours(1)).unwrap();
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));

        let foreign = TokenVerifier::new(b"test-secret-key-with-at-least-32-bytes", "eventos-identity", "other-api");
        let token = foreign.issue("uid-1", None, Duration::hours(1)).unwrap();
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_header_parsing() {
        let verifier = verifier();
        assert!(matches!(verifier.verify_header(None), Err(AuthError::MissingToken)));
        assert!(matches!(verifier.verify_header(Some("Basic abc")), Err(AuthError::MissingToken)));
        assert!(matches!(verifier.verify_header(Some("Bearer ")), Err(AuthError::MissingToken)));

        let token = verifier.issue("uid-2", None, Duration::hours(1)).unwrap();
        let claims = verifier.verify_header(Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(claims.sub, "uid-2");
    }
}
