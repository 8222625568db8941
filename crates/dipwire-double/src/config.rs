//! Configuration for the protocol double.

use dipwire_session::StaticCredentials;

/// What the double knows before any client connects.
///
/// ```rust
/// use dipwire_double::DoubleConfig;
///
/// let config = DoubleConfig::default().user("alice", "wonderland");
/// assert!(config.users.iter().any(|(name, _)| name == "alice"));
/// ```
#[derive(Debug, Clone)]
pub struct DoubleConfig {
    /// Accounts accepted by `sign_in`, as `(username, password)`.
    ///
    /// Default: `test_user`/`test_password`, `ai_player`/`password` and
    /// `player1`/`password`.
    pub users: Vec<(String, String)>,

    /// Maps listed by `get_available_maps`.
    pub map_names: Vec<String>,

    /// DAIDE port handed out for the first game; later games count up.
    ///
    /// Default: 16713.
    pub first_daide_port: u16,
}

impl DoubleConfig {
    /// Adds an account.
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.push((username.into(), password.into()));
        self
    }

    pub fn map_names<I, S>(mut self, map_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_names = map_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn first_daide_port(mut self, port: u16) -> Self {
        self.first_daide_port = port;
        self
    }

    /// The accounts as an authenticator.
    pub fn credentials(&self) -> StaticCredentials {
        self.users.iter().cloned().collect()
    }
}

impl Default for DoubleConfig {
    fn default() -> Self {
        let users = [
            ("test_user", "test_password"),
            ("ai_player", "password"),
            ("player1", "password"),
        ];
        Self {
            users: users
                .iter()
                .map(|(u, p)| (u.to_string(), p.to_string()))
                .collect(),
            map_names: ["standard", "ancmed", "modern", "pure"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            first_daide_port: 16713,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_test_user() {
        let config = DoubleConfig::default();
        assert!(config.credentials().contains("test_user"));
        assert_eq!(config.credentials().len(), 3);
        assert!(config.map_names.contains(&"standard".to_string()));
    }

    #[test]
    fn test_builder_methods_override_defaults() {
        let config = DoubleConfig::default()
            .user("alice", "pw")
            .map_names(["standard"])
            .first_daide_port(9000);
        assert!(config.credentials().contains("alice"));
        assert_eq!(config.map_names, vec!["standard".to_string()]);
        assert_eq!(config.first_daide_port, 9000);
    }
}
