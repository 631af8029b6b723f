//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while talking to the remote
//! ticketing API: transport failures, non-success responses and payloads that
//! cannot be decoded. Callers treat every variant the same way (the session
//! fails closed), but the variants keep enough detail for logging.

use thiserror::Error;

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("remote API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The gateway itself is misconfigured (bad base URL, missing user id).
    #[error("gateway configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    /// HTTP status carried by the error, if the remote API produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AdapterError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-readable label used in session failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Transport(_) => "transport",
            AdapterError::Status { .. } => "rejected",
            AdapterError::Decode(_) => "malformed",
            AdapterError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            AdapterError::Transport(err.to_string())
        }
    }
}
