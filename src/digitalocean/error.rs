//! Error types for the DigitalOcean client.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the DigitalOcean client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DigitalOceanError {
    /// Raised when credentials or endpoint settings are unusable.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the request never produced a response.
    #[error("request to {operation} failed: {message}")]
    Transport {
        /// Operation being attempted.
        operation: &'static str,
        /// Message from the HTTP client.
        message: String,
    },
    /// Raised when the API rejects a request.
    #[error("{operation} rejected by provider: {message}")]
    Api {
        /// Operation being attempted.
        operation: &'static str,
        /// HTTP status code of the response.
        status: u16,
        /// Provider supplied message.
        message: String,
    },
    /// Raised when a successful response cannot be decoded.
    #[error("unexpected {operation} response: {message}")]
    Decode {
        /// Operation being attempted.
        operation: &'static str,
        /// Decoder message.
        message: String,
    },
}

impl From<ConfigError> for DigitalOceanError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
