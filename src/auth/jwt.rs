//! JWT token issuance and parsing
//! Access and refresh tokens share one claim shape and one signing key

use crate::{
    clock::Clock,
    config::SecurityConfig,
    error::{AppError, TokenError},
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The only accepted signing algorithm
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum HMAC secret length in bytes
const MIN_SECRET_LEN: usize = 32;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,

    /// JWT ID, keeps tokens issued within the same second distinct
    pub jti: String,
}

/// Signs and parses credential tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        // Expiry is checked against the injected clock after the signature passes
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    /// Create codec from config
    pub fn from_config(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        Self::new(config.jwt_secret.expose_secret().as_bytes(), clock)
    }

    /// Issue a signed token for `subject` valid for `ttl`
    pub fn issue(&self, subject: &str, email: &str, ttl: Duration) -> Result<String, AppError> {
        let now = self.clock.now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| AppError::Internal("Token TTL out of range".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Verify signature, then expiry, and return the embedded claims
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let kind = classify(e.kind());
                tracing::debug!(reason = ?kind, "Token validation failed: {:?}", e);
                kind
            })?
            .claims;

        if self.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Map library failures onto the public taxonomy
fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        // A header naming any other algorithm is treated as a forgery
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::SignatureMismatch,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const SECRET: &[u8] = b"test_secret_key_32_characters_long!";

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new(SECRET, clock.clone()).unwrap();
        (codec, clock)
    }

    #[test]
    fn test_issue_and_parse() {
        let (codec, _) = codec();
        let user_id = Uuid::new_v4().to_string();

        let token = codec.issue(&user_id, "a@x.com", Duration::from_secs(900)).unwrap();
        let claims = codec.parse(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_has_three_segments() {
        let (codec, _) = codec();
        let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_expired_after_ttl() {
        let (codec, clock) = codec();
        let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();

        clock.advance(chrono::Duration::seconds(60));
        assert!(codec.parse(&token).is_ok());

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(codec.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_signature_mismatch() {
        let (codec, clock) = codec();
        let other = TokenCodec::new(b"another_secret_key_32_characters_long", clock).unwrap();

        let token = other.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();
        assert_eq!(codec.parse(&token), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_expiry_not_reported_for_forged_token() {
        let (codec, clock) = codec();
        let other = TokenCodec::new(b"another_secret_key_32_characters_long", clock.clone()).unwrap();

        let token = other.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(codec.parse(&token), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_invalid_token_is_malformed() {
        let (codec, _) = codec();
        assert_eq!(codec.parse("invalid_token"), Err(TokenError::Malformed));
        assert_eq!(codec.parse(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_short_secret_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        assert!(TokenCodec::new(b"short", clock).is_err());
    }
}
