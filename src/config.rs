//! Configuration management for the chat relay
//!
//! Values come from an optional `config.toml` in the working directory,
//! overridden by `CHAT_RELAY_*` environment variables (nested keys separated
//! by `__`, e.g. `CHAT_RELAY_SERVER__PORT=9000`).

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: StartupConfig,
    pub auth: AuthConfig,

    /// Enables development-only behaviour such as `auth.mode = "allow_all"`.
    pub dev_mode: bool,
}

/// Network and session settings, read once at startup
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StartupConfig {
    /// IP address to bind the listener
    pub bind_address: String,

    /// Listening port
    pub port: u16,

    /// Path that accepts WebSocket upgrades
    pub ws_path: String,

    /// Maximum concurrent sessions
    pub max_connections: usize,

    /// Time allowed for the handshake and for the credentials message
    pub auth_timeout_secs: u64,

    /// Idle read timeout in the message loop; 0 disables it
    pub idle_timeout_secs: u64,

    /// Largest accepted WebSocket message, in bytes
    pub max_message_size: usize,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8078,
            ws_path: "/ws".to_string(),
            max_connections: 1024,
            auth_timeout_secs: 10,
            idle_timeout_secs: 0,
            max_message_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Check against `auth.users`
    #[default]
    Static,
    /// Accept every login; needs `dev_mode`
    AllowAll,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,

    /// username -> password
    pub users: HashMap<String, String>,
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("CHAT_RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Loopback listener on an ephemeral port with authentication disabled.
    pub fn for_tests() -> Self {
        Self {
            server: StartupConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 0,
                auth_timeout_secs: 2,
                ..StartupConfig::default()
            },
            auth: AuthConfig {
                mode: AuthMode::AllowAll,
                users: HashMap::new(),
            },
            dev_mode: true,
        }
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if !server.ws_path.starts_with('/') {
            return Err(config::ConfigError::Message(
                "ws_path must start with '/'".into(),
            ));
        }

        if server.max_connections == 0 {
            return Err(config::ConfigError::Message(
                "max_connections must be greater than 0".into(),
            ));
        }

        if server.max_message_size == 0 {
            return Err(config::ConfigError::Message(
                "max_message_size must be greater than 0".into(),
            ));
        }

        if server.auth_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "auth_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.auth.mode == AuthMode::AllowAll && !self.dev_mode {
            return Err(config::ConfigError::Message(
                "auth.mode = \"allow_all\" is only allowed with dev_mode = true".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and port as a socket address string
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.listen_addr(), "0.0.0.0:8078");
        assert_eq!(config.server.ws_path, "/ws");
        assert_eq!(config.auth.mode, AuthMode::Static);
        assert_eq!(config.server.idle_timeout(), None);
    }

    #[test]
    fn allow_all_requires_dev_mode() {
        let mut config = ServerConfig::default();
        config.auth.mode = AuthMode::AllowAll;
        assert!(config.validate().is_err());

        config.dev_mode = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.server.ws_path = "ws".into();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.max_message_size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.auth_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml() {
        let settings = Config::builder()
            .add_source(File::from_str(
                r#"
                dev_mode = false

                [server]
                port = 9000
                idle_timeout_secs = 30

                [auth]
                mode = "static"

                [auth.users]
                alice = "x"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: ServerConfig = settings.try_deserialize().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.ws_path, "/ws");
        assert_eq!(config.server.idle_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.auth.users.get("alice").map(String::as_str), Some("x"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_binds_loopback() {
        let config = ServerConfig::for_tests();
        assert_eq!(config.server.listen_addr(), "127.0.0.1:0");
        assert!(config.dev_mode);
    }
}
