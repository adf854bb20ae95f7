//! Response envelope handling for the v1 API.
//!
//! Every body carries a `status` field. Anything but `OK` is a failure whose
//! text lives in `error_message` or, on some endpoints, `message`.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::DigitalOceanError;

const STATUS_OK: &str = "OK";

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Payload of `GET /droplets/`.
#[derive(Debug, Deserialize)]
pub(super) struct DropletList<T> {
    pub(super) droplets: Vec<T>,
}

/// Payload of endpoints returning a single droplet.
#[derive(Debug, Deserialize)]
pub(super) struct DropletBody<T> {
    pub(super) droplet: T,
}

/// Payload of action endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct EventBody {
    pub(super) event_id: u64,
}

/// Turns an HTTP status and body into `T` or a provider error.
pub(super) fn decode<T: DeserializeOwned>(
    operation: &'static str,
    status: StatusCode,
    body: &[u8],
) -> Result<T, DigitalOceanError> {
    let envelope = serde_json::from_slice::<Envelope>(body).ok();
    let rejected = envelope
        .as_ref()
        .and_then(|envelope| envelope.status.as_deref())
        .is_some_and(|value| value != STATUS_OK);

    if !status.is_success() || rejected {
        let message = envelope
            .and_then(|envelope| envelope.error_message.or(envelope.message))
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        return Err(DigitalOceanError::Api {
            operation,
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(body).map_err(|err| DigitalOceanError::Decode {
        operation,
        message: err.to_string(),
    })
}
