//! Credential checking for `sign_in`.
//!
//! The protocol only says that a `sign_in` carries a username and password
//! and that a wrong pair yields `AUTHENTICATION_ERROR`. Where the users live
//! is up to the server, so the check is the [`Authenticator`] trait.
//! [`StaticCredentials`] is the in-memory table the protocol double uses.

use std::collections::HashMap;
use std::future::Future;

use crate::SessionError;

/// Validates a username/password pair.
///
/// # Example
///
/// ```rust
/// use dipwire_session::{Authenticator, SessionError};
///
/// /// Accepts any user whose password equals their name reversed.
/// struct MirrorAuthenticator;
///
/// impl Authenticator for MirrorAuthenticator {
///     async fn authenticate(
///         &self,
///         username: &str,
///         password: &str,
///     ) -> Result<(), SessionError> {
///         let reversed: String = username.chars().rev().collect();
///         if reversed == password {
///             Ok(())
///         } else {
///             Err(SessionError::AuthFailed("Invalid username or password".into()))
///         }
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `Ok(())` when the pair is valid.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] with a message fit to show the client.
    fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// A fixed username to password table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a user.
    pub fn with_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.insert(username, password);
        self
    }

    pub fn insert(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.users.insert(username.into(), password.into());
    }

    /// Removes a user. Returns `true` if they existed.
    pub fn remove(&mut self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn check(&self, username: &str, password: &str) -> Result<(), SessionError> {
        match self.users.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(SessionError::AuthFailed(
                "Invalid username or password".into(),
            )),
        }
    }
}

impl<U, P> FromIterator<(U, P)> for StaticCredentials
where
    U: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        Self {
            users: iter
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }
}

impl Authenticator for StaticCredentials {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        self.check(username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> StaticCredentials {
        StaticCredentials::new()
            .with_user("player1", "password")
            .with_user("test_user", "test_password")
    }

    #[tokio::test]
    async fn test_authenticate_known_user_succeeds() {
        let creds = credentials();
        creds
            .authenticate("player1", "password")
            .await
            .expect("valid pair");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_fails() {
        let creds = credentials();
        let err = creds.authenticate("player1", "nope").await.unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user_fails() {
        let creds = credentials();
        let result = creds.authenticate("mallory", "password").await;
        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[test]
    fn test_from_iter_and_remove() {
        let mut creds: StaticCredentials =
            [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(creds.len(), 2);
        assert!(creds.remove("a"));
        assert!(!creds.contains("a"));
        assert!(!creds.remove("a"));
    }
}
