//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// DigitalOcean credentials and endpoint derived from environment variables,
/// configuration files, and explicit flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "DO")]
pub struct ProviderConfig {
    /// Client identifier issued with the API key.
    pub client_id: Option<String>,
    /// API key paired with `client_id`.
    pub api_key: Option<String>,
    /// Base URL of the v1 API. Overridable for tests and proxies.
    #[ortho_config(default = "https://api.digitalocean.com".to_owned())]
    pub api_base: String,
    /// Timeout in seconds for each HTTP request. Defaults to 30 seconds.
    pub request_timeout_secs: Option<u64>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

/// Credentials that passed validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    /// Client identifier.
    pub client_id: String,
    /// API key.
    pub api_key: String,
}

impl ProviderConfig {
    fn require_field<'a>(
        value: Option<&'a str>,
        metadata: &FieldMetadata,
    ) -> Result<&'a str, ConfigError> {
        value
            .map(str::trim)
            .filter(|trimmed| !trimmed.is_empty())
            .ok_or_else(|| {
                ConfigError::MissingField(format!(
                    "{} is not set; pass --{}, set {}, or add {} to dropwarden.toml",
                    metadata.description,
                    metadata.toml_key.replace('_', "-"),
                    metadata.env_var,
                    metadata.toml_key
                ))
            })
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("dropwarden")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Replaces credentials with explicitly supplied values.
    #[must_use]
    pub fn with_overrides(mut self, client_id: Option<String>, api_key: Option<String>) -> Self {
        if client_id.is_some() {
            self.client_id = client_id;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        self
    }

    /// Returns the configured per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
    }

    /// Returns trimmed credentials after validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when either credential is absent
    /// or blank.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let client_id = Self::require_field(
            self.client_id.as_deref(),
            &FieldMetadata::new("DigitalOcean client ID", "DO_CLIENT_ID", "client_id"),
        )?;
        let api_key = Self::require_field(
            self.api_key.as_deref(),
            &FieldMetadata::new("DigitalOcean API key", "DO_API_KEY", "api_key"),
        )?;
        Ok(Credentials {
            client_id: client_id.to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a credential or the API base
    /// URL is empty, and [`ConfigError::Parse`] for a zero request timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        Self::require_field(
            Some(self.api_base.as_str()),
            &FieldMetadata::new("API base URL", "DO_API_BASE", "api_base"),
        )?;
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Parse(String::from(
                "request_timeout_secs must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
