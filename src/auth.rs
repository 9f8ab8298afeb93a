//! Connection-time credential verification.
//!
//! A connection presents a signed token either as a `token` query parameter
//! on the upgrade URL or as an `Authorization: Bearer` header. Verification
//! runs once, before the socket upgrades; a failed check refuses the
//! connection outright, with no retry.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::store::{Identity, Role};
use crate::AppState;

/// Claims carried by the handshake credential.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity's id.
    pub sub: i64,
    /// Role recorded when the token was minted.
    pub role: Role,
    /// Issued-at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Why a handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No credential in the query string or Authorization header.
    MissingCredential,
    /// Signature or expiry check failed.
    InvalidCredential,
    /// The token subject no longer resolves in the identity store.
    UnknownIdentity,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing-credential",
            AuthError::InvalidCredential => "invalid-credential",
            AuthError::UnknownIdentity => "unknown-identity",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "No credential provided",
            AuthError::InvalidCredential => "Invalid or expired credential",
            AuthError::UnknownIdentity => "Unknown identity",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::unauthorized(self.code(), self.message()).into_response()
    }
}

/// Pull the credential out of the upgrade request: `?token=` first, then
/// the bearer header. Browser WebSocket clients cannot set headers, so the
/// query form is the common path.
pub fn extract_credential<'a>(
    query_token: Option<&'a str>,
    headers: &'a HeaderMap,
) -> Option<&'a str> {
    if let Some(token) = query_token {
        if !token.is_empty() {
            return Some(token);
        }
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Verify the token signature and expiry against the shared secret.
pub fn verify_credential(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| {
        tracing::debug!(%err, "credential rejected");
        AuthError::InvalidCredential
    })
}

/// Authenticate a connection attempt: verify the credential and resolve its
/// subject to a live identity. Runs once per connection, before admission.
pub async fn authenticate(
    state: &AppState,
    credential: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = credential.ok_or(AuthError::MissingCredential)?;
    let claims = verify_credential(token, &state.config.jwt_secret)?;

    match state.identities.lookup_by_id(claims.sub).await {
        Ok(Some(identity)) => Ok(identity),
        Ok(None) => Err(AuthError::UnknownIdentity),
        Err(err) => {
            tracing::error!(%err, subject = claims.sub, "identity lookup failed during handshake");
            Err(AuthError::UnknownIdentity)
        }
    }
}
