//! Runtime configuration
//!
//! Where the broker lives and how to authenticate against it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the broker base URL
pub const SERVER_ENV: &str = "COS_SERVER";

/// Environment variable holding the bearer token
pub const AUTH_ENV: &str = "COS_AUTH";

/// Broker used when nothing else is configured
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

/// Configuration for connecting to the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the broker (e.g., "http://127.0.0.1:8000")
    #[serde(default = "default_server")]
    pub server: String,

    /// Optional bearer token sent as `Authorization: Bearer <token>`
    #[serde(default)]
    pub auth: Option<String>,

    /// Optional TCP connect timeout in seconds. Streams themselves never time out.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

impl RuntimeConfig {
    /// Create a configuration for the given broker without auth
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            auth: None,
            connect_timeout_secs: None,
        }
    }

    /// Create a configuration from `COS_SERVER` / `COS_AUTH`
    pub fn from_env() -> Self {
        let server = std::env::var(SERVER_ENV).unwrap_or_else(|_| default_server());
        let config = Self::new(server);
        match std::env::var(AUTH_ENV) {
            Ok(token) => config.with_auth(token),
            Err(_) => config,
        }
    }

    /// Set the bearer token. An empty token means no auth.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.server, DEFAULT_SERVER);
        assert!(config.auth.is_none());
        assert!(config.connect_timeout().is_none());
    }

    #[test]
    fn test_empty_auth_is_none() {
        let config = RuntimeConfig::new("http://broker").with_auth("");
        assert!(config.auth.is_none());

        let config = config.with_auth("secret");
        assert_eq!(config.auth.as_deref(), Some("secret"));
    }

    #[test]
    fn test_base_url_trims_slash() {
        let config = RuntimeConfig::new("http://broker:8000/");
        assert_eq!(config.base_url(), "http://broker:8000");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"auth":"t"}"#).unwrap();
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.auth.as_deref(), Some("t"));

        let config: RuntimeConfig =
            serde_json::from_str(r#"{"server":"http://x","connect_timeout_secs":5}"#).unwrap();
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
    }
}
