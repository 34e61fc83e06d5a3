//! Authentication validator
//!
//! The `Authenticator` capability and its implementations. The server only
//! ever sees `Arc<dyn Authenticator>`, so a real identity backend can be
//! plugged in without touching the session code.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::config::{AuthConfig, AuthMode, ServerConfig};
use crate::error::AuthError;

const MAX_CREDENTIAL_LENGTH: usize = 256;

/// Decides whether a username/password pair may join.
///
/// Implementations must not log or retain the password.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Performs basic input sanitation to check for malicious or malformed usernames/passwords.
fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty()
        && input.len() <= MAX_CREDENTIAL_LENGTH
        && !input.contains(['\r', '\n', '\0'])
}

/// Checks credentials against a fixed table of users.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, String>,
}

impl StaticAuthenticator {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let authenticator = Self::new(config.users.clone());
        match authenticator.user_count() {
            0 => warn!("No users configured; every login will be rejected"),
            n => info!("Static authentication enabled for {} users", n),
        }
        authenticator
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        if !is_valid_input(username) || !is_valid_input(password) {
            return false;
        }

        matches!(self.users.get(username), Some(stored) if stored == password)
    }
}

/// Accepts everyone. Development and tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAuthenticator;

impl Authenticator for AllowAllAuthenticator {
    fn authenticate(&self, _username: &str, _password: &str) -> bool {
        true
    }
}

/// Builds the authenticator selected by configuration.
///
/// `allow_all` is refused unless `dev_mode` is set.
pub fn build_authenticator(config: &ServerConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match config.auth.mode {
        AuthMode::Static => Ok(Arc::new(StaticAuthenticator::from_config(&config.auth))),
        AuthMode::AllowAll if config.dev_mode => {
            warn!("Authentication disabled: every login is accepted (dev_mode)");
            Ok(Arc::new(AllowAllAuthenticator))
        }
        AuthMode::AllowAll => Err(AuthError::InsecureMode(
            "auth.mode = \"allow_all\" requires dev_mode = true".into(),
        )),
    }
}
