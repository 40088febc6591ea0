//! Bearer token codec
//!
//! Creates and verifies the signed JWTs used for session authentication.
//! Verification only ever accepts HMAC-family algorithms; the algorithm a
//! token claims in its header is not trusted.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use super::models::Claims;

/// Token lifetime for newly signed tokens.
const TOKEN_TTL_HOURS: i64 = 24;

/// Reasons a bearer token failed verification.
///
/// These are logged server-side only; the identity middleware never surfaces
/// them to the client.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("no signing secret configured")]
    MissingSecret,

    #[error("missing or non-numeric id claim")]
    MissingClaim,

    #[error("token expired")]
    Expired,
}

/// Signs and verifies bearer tokens with a shared symmetric secret.
///
/// The secret is validated at construction; an empty secret is a startup
/// configuration error, not a per-token condition.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Creates a signed token carrying the user id claim.
    pub fn sign(&self, user_id: i64) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let claims = Claims {
            id: user_id,
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| TokenError::Malformed)
    }

    /// Verifies a token and returns the user id it carries.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        // Explicit HMAC allow-list; a token claiming RS256 (or anything
        // outside this family) is rejected before any signature check.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // The id claim is required by the Claims shape; its absence
            // surfaces as a deserialization error.
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => TokenError::MissingClaim,
            _ => TokenError::Malformed,
        })?;

        debug!(user_id = decoded.claims.id, "Bearer token verified");
        Ok(decoded.claims.id)
    }
}
