//! Request authentication from the `Authorization` header.

use crate::auth::keys::ApiKeyManager;
use crate::error::{AuthError, AuthResult};
use std::sync::Arc;
use tracing::warn;

/// Extract the token from an `Authorization` value. A missing `Bearer `
/// prefix leaves the whole value as the token.
pub fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks credentials against managed keys when a key manager is present,
/// otherwise against a single static key.
#[derive(Clone)]
pub struct Authenticator {
    keys: Option<Arc<ApiKeyManager>>,
    static_key: Option<String>,
}

impl Authenticator {
    pub fn managed(keys: Arc<ApiKeyManager>) -> Self {
        Self {
            keys: Some(keys),
            static_key: None,
        }
    }

    pub fn static_key(key: Option<String>) -> Self {
        Self {
            keys: None,
            static_key: key.filter(|k| !k.is_empty()),
        }
    }

    pub fn key_manager(&self) -> Option<&Arc<ApiKeyManager>> {
        self.keys.as_ref()
    }

    /// Validate the raw `Authorization` value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthResult<()> {
        let Some(header) = authorization else {
            warn!("Rejected request without credentials");
            return Err(AuthError::Unauthorized);
        };
        let token = bearer_token(header);

        let valid = match (&self.keys, &self.static_key) {
            (Some(keys), _) => keys.validate(token).await?,
            (None, Some(expected)) => constant_time_eq(token, expected),
            (None, None) => false,
        };

        if valid {
            Ok(())
        } else {
            warn!("Rejected request with invalid API key");
            Err(AuthError::Unauthorized)
        }
    }
}
