//! Client credentials
//!
//! The first message on every connection. Credentials only live for the
//! authentication step; the password never reaches a log line.

use std::fmt;

use serde::Deserialize;

use crate::registry::Identity;

/// `{"username": ..., "password": ...}` as sent by the client.
///
/// Missing fields read as empty strings and are left to the authenticator.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Keeps the username and drops the password.
    pub fn into_identity(self) -> Identity {
        Identity::new(self.username)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn deserializes_from_json() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username":"alice","password":"x"}"#).unwrap();
        assert_eq!(creds.username(), "alice");
        assert_eq!(creds.password(), "x");
        assert_eq!(creds.into_identity(), Identity::new("alice"));
    }

    #[test]
    fn missing_fields_read_as_empty() {
        let creds: Credentials = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(creds.username(), "alice");
        assert_eq!(creds.password(), "");

        let creds: Credentials = serde_json::from_str("{}").unwrap();
        assert_eq!(creds.username(), "");
    }

    #[test]
    fn non_object_is_rejected() {
        let result: Result<Credentials, _> = serde_json::from_str(r#""alice""#);
        assert!(result.is_err());
        let result: Result<Credentials, _> = serde_json::from_str(r#"{"username":42}"#);
        assert!(result.is_err());
    }
}
