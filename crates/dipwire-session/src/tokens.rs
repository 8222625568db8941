//! The server-side token registry.
//!
//! Tracks which tokens have been issued and to whom. A server mints a token
//! on every successful `sign_in` and checks it on every channel- or
//! game-scoped request.
//!
//! Like the rest of the session layer this is a plain `HashMap` with no
//! locking of its own; the owner wraps it in whatever lock it needs.

use std::collections::HashMap;

use dipwire_protocol::Token;
use rand::Rng;

use crate::SessionError;

/// Prefix on every minted token, so they are easy to spot in logs.
pub const TOKEN_PREFIX: &str = "fake_token_";

/// Issued tokens, keyed by token, valued by username.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: HashMap<Token, String>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new token for `username`.
    ///
    /// A user may hold several tokens at once (one per sign-in).
    pub fn issue(&mut self, username: &str) -> Token {
        let token = generate_token();
        self.tokens.insert(token.clone(), username.to_string());
        tracing::info!(username, "token issued");
        token
    }

    /// Returns the username the token was issued to.
    ///
    /// # Errors
    /// [`SessionError::InvalidToken`] if the token is unknown or revoked.
    pub fn validate(&self, token: &Token) -> Result<&str, SessionError> {
        self.tokens
            .get(token)
            .map(String::as_str)
            .ok_or(SessionError::InvalidToken)
    }

    /// Revokes one token, returning its owner.
    pub fn revoke(&mut self, token: &Token) -> Option<String> {
        self.tokens.remove(token)
    }

    /// Revokes every token held by `username`. Returns how many were removed.
    pub fn revoke_user(&mut self, username: &str) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, owner| owner != username);
        before - self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Generates `fake_token_` followed by 32 hex characters (128 random bits).
fn generate_token() -> Token {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Token::new(format!("{TOKEN_PREFIX}{hex}"))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_returns_prefixed_token() {
        let mut registry = TokenRegistry::new();
        let token = registry.issue("player1");
        assert!(token.as_str().starts_with(TOKEN_PREFIX));
        assert_eq!(token.as_str().len(), TOKEN_PREFIX.len() + 32);
    }

    #[test]
    fn test_issue_twice_gives_distinct_tokens() {
        let mut registry = TokenRegistry::new();
        let a = registry.issue("player1");
        let b = registry.issue("player1");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_validate_issued_token_returns_username() {
        let mut registry = TokenRegistry::new();
        let token = registry.issue("player1");
        assert_eq!(registry.validate(&token).unwrap(), "player1");
    }

    #[test]
    fn test_validate_unknown_token_returns_invalid_token() {
        let registry = TokenRegistry::new();
        let result = registry.validate(&Token::new("not-a-real-token"));
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_revoke_makes_token_invalid() {
        let mut registry = TokenRegistry::new();
        let token = registry.issue("player1");
        assert_eq!(registry.revoke(&token).as_deref(), Some("player1"));
        assert!(registry.validate(&token).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_revoke_user_removes_all_their_tokens() {
        let mut registry = TokenRegistry::new();
        registry.issue("player1");
        registry.issue("player1");
        let other = registry.issue("player2");

        assert_eq!(registry.revoke_user("player1"), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.validate(&other).is_ok());
    }
}
