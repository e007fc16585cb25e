//! Session token issuance and verification
//!
//! Tokens are HS256 JWTs binding an account ID to the instant they were issued.
//! The validity window is fixed at issuance and checked with zero leeway; there
//! is no server-side revocation apart from the password-change staleness rule
//! applied by the authorization chain.

use chrono::{DateTime, Duration, Utc};
use exploria_core::config::MAX_TOKEN_TTL_DAYS;
use exploria_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - account ID
    pub sub: String,
    /// Unique token identifier
    pub jti: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Issued at (unix millis); staleness is judged against this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_ms: Option<i64>,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Session token errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// What a successfully verified token asserts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject_id: String,
    /// Unix millis; tokens without `iat_ms` fall back to `iat * 1000`
    pub issued_at_ms: i64,
    pub token_id: String,
}

/// Issues and verifies session tokens with one process-wide signing key
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokens {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.jwt_issuer.clone(),
            ttl: Duration::days(config.token_ttl_days.min(MAX_TOKEN_TTL_DAYS) as i64),
        }
    }

    /// Validity window of every issued token
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject_id` stamped with the current time
    pub fn issue(&self, subject_id: &str) -> Result<String, JwtError> {
        self.issue_at(subject_id, Utc::now())
    }

    /// Issue a token with an explicit issue instant
    pub fn issue_at(&self, subject_id: &str, issued_at: DateTime<Utc>) -> Result<String, JwtError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            iat_ms: Some(issued_at.timestamp_millis()),
            exp: iat + self.ttl.num_seconds(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check structure, signature, issuer and expiry
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            }
        })?;

        let claims = data.claims;
        Ok(VerifiedToken {
            issued_at_ms: claims.iat_ms.unwrap_or(claims.iat * 1000),
            subject_id: claims.sub,
            token_id: claims.jti,
        })
    }
}
