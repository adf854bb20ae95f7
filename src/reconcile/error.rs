//! Errors surfaced by the reconciler.

use thiserror::Error;

use crate::instance::InstanceId;
use crate::provider::RequestError;

/// Why a reconciliation did not reach the desired state.
///
/// Nothing is rolled back on failure: a droplet created before a timeout
/// stays on the provider, which is why timeouts carry its id.
#[derive(Debug, Error)]
pub enum ReconcileError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised before any provider call when the request is incomplete.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Failure reported by the provider, passed through unchanged.
    #[error(transparent)]
    Provider(ProviderError),
    /// Raised when the provider returns attributes that cannot be merged
    /// into the droplet snapshot.
    #[error("droplet {instance_id} returned malformed attributes: {message}")]
    MalformedAttributes {
        /// Provider droplet identifier.
        instance_id: InstanceId,
        /// Decoder message.
        message: String,
    },
    /// Raised when the droplet is not running with an address in time.
    #[error("{message} (droplet {instance_id})")]
    Timeout {
        /// Droplet left behind on the provider.
        instance_id: InstanceId,
        /// Human readable reason.
        message: String,
    },
}

impl<ProviderError> ReconcileError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Returns the droplet the failure relates to, when known.
    #[must_use]
    pub const fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::MalformedAttributes { instance_id, .. } | Self::Timeout { instance_id, .. } => {
                Some(*instance_id)
            }
            Self::Validation(_) | Self::Provider(_) => None,
        }
    }

    /// Returns `true` for deadline and missing-address failures.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl<ProviderError> From<RequestError> for ReconcileError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    fn from(value: RequestError) -> Self {
        Self::Validation(value.to_string())
    }
}
