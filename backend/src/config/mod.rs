//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the listen address, the remote API base URL, request timeouts, the names of
//! the cookies the browser keeps its credential in, how long idle sessions are
//! kept, and the log filter.
//!
//! See [`ConfigLoader`] for how the layers are merged.

mod loader;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use loader::ConfigLoader;

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "TICKETDASH_CONFIG";
pub const ENV_LISTEN_ADDR: &str = "TICKETDASH_LISTEN_ADDR";
pub const ENV_API_BASE_URL: &str = "TICKETDASH_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TICKETDASH_REQUEST_TIMEOUT_SECS";
pub const ENV_SESSION_IDLE_SECS: &str = "TICKETDASH_SESSION_IDLE_SECS";
pub const ENV_MAX_SESSIONS: &str = "TICKETDASH_MAX_SESSIONS";
pub const ENV_LOG: &str = "TICKETDASH_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub listen_addr: SocketAddr,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Cookie the remote API reads the session token from.
    pub api_token_cookie: String,
    pub token_cookie: String,
    pub user_cookie: String,
    pub session_idle_secs: u64,
    pub max_sessions: usize,
    pub log_filter: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            request_timeout_secs: 30,
            api_token_cookie: "token".to_string(),
            token_cookie: "token".to_string(),
            user_cookie: "userId".to_string(),
            session_idle_secs: 30 * 60,
            max_sessions: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api_base_url", "must not be empty"));
        }
        if self.token_cookie.is_empty()
            || self.user_cookie.is_empty()
            || self.api_token_cookie.is_empty()
        {
            return Err(ConfigError::invalid("cookies", "cookie names must not be empty"));
        }
        if self.session_idle_secs == 0 {
            return Err(ConfigError::invalid(
                "session_idle_secs",
                "must be greater than zero",
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::invalid("max_sessions", "must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    #[error("invalid configuration for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
