//! Identity provider seam.
//!
//! Token verification belongs to an external identity provider; the core
//! only needs a stable user id for an authenticated caller.

use crate::PaygateError;
use std::collections::HashMap;

/// Verifies bearer tokens and yields the caller's user id.
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user id.
    ///
    /// # Errors
    /// `Authentication` if the token is unknown, expired or malformed.
    fn verify_token(&self, token: &str) -> Result<String, PaygateError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, PaygateError> {
    let header = header.ok_or(PaygateError::Authentication)?.trim();

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(PaygateError::Authentication)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(PaygateError::Authentication);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(PaygateError::Authentication);
    }
    Ok(token)
}

/// Authenticate an `Authorization` header against a provider.
pub fn authenticate(
    provider: &dyn IdentityProvider,
    header: Option<&str>,
) -> Result<String, PaygateError> {
    let token = bearer_token(header)?;
    provider.verify_token(token)
}

/// Fixed token table, for development and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentity {
    tokens: HashMap<String, String>,
}

impl StaticIdentity {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user.
    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

impl IdentityProvider for StaticIdentity {
    fn verify_token(&self, token: &str) -> Result<String, PaygateError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(PaygateError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer   tok ")).unwrap(), "tok");
    }

    #[test]
    fn test_bearer_token_rejects_bad_headers() {
        assert!(matches!(bearer_token(None), Err(PaygateError::Authentication)));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(PaygateError::Authentication)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer")),
            Err(PaygateError::Authentication)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer   ")),
            Err(PaygateError::Authentication)
        ));
    }

    #[test]
    fn test_authenticate_with_static_identity() {
        let provider = StaticIdentity::new().with_token("tok-1", "user-1");

        assert_eq!(
            authenticate(&provider, Some("Bearer tok-1")).unwrap(),
            "user-1"
        );
        assert!(matches!(
            authenticate(&provider, Some("Bearer tok-2")),
            Err(PaygateError::Authentication)
        ));
    }
}
