//! Token verification: turns a client token into an [`Identity`].
//!
//! Tokens are HS256 JWTs issued elsewhere; this service only verifies them.
//! The identity is the `userId` claim, accepted as a string or a number.
//! An `exp` claim is enforced when present.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Verified identity of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token required")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token has no userId claim")]
    NoUserId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserIdClaim {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: Option<UserIdClaim>,
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation }
    }

    /// Verify `token` and extract its identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Missing`] for a blank token, [`AuthError::Invalid`]
    /// for a bad signature, algorithm or expiry, and [`AuthError::NoUserId`]
    /// when the `userId` claim is absent or empty.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let claims = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?.claims;
        let user_id = match claims.user_id {
            Some(UserIdClaim::Text(text)) => text,
            Some(UserIdClaim::Number(n)) => n.to_string(),
            None => return Err(AuthError::NoUserId),
        };
        if user_id.is_empty() {
            return Err(AuthError::NoUserId);
        }
        Ok(Identity { user_id })
    }

    /// Verify an optional token, as taken from a query string.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub fn verify_opt(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        self.verify(token.ok_or(AuthError::Missing)?)
    }
}
