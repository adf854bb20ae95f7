//! DigitalOcean v1 API implementation of [`ProviderClient`].
//!
//! The v1 API authenticates with `client_id` and `api_key` query parameters
//! and exposes every operation, including mutations, as a `GET`.

mod error;
mod wire;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{Credentials, ProviderConfig};
use crate::instance::{Instance, InstanceAttributes, InstanceId};
use crate::provider::{CreateRequest, DestroyReceipt, ProviderClient, ProviderFuture};
use wire::{DropletBody, DropletList, EventBody};

pub use error::DigitalOceanError;

/// Client for the DigitalOcean droplet endpoints.
#[derive(Clone)]
pub struct DigitalOceanClient {
    http: reqwest::Client,
    api_base: String,
    credentials: Credentials,
}

impl fmt::Debug for DigitalOceanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanClient")
            .field("api_base", &self.api_base)
            .field("client_id", &self.credentials.client_id)
            .finish_non_exhaustive()
    }
}

impl DigitalOceanClient {
    /// Constructs a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DigitalOceanError::Config`] when the configuration fails
    /// validation or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, DigitalOceanError> {
        config.validate()?;
        let credentials = config.credentials()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| DigitalOceanError::Config(err.to_string()))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim().trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, DigitalOceanError> {
        // Credentials travel in the query string; keep the URL out of errors.
        let url = format!("{}{path}", self.api_base);
        debug!(operation, %url, "sending request");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("api_key", self.credentials.api_key.as_str()),
            ])
            .query(params)
            .send()
            .await
            .map_err(|err| DigitalOceanError::Transport {
                operation,
                message: err.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| DigitalOceanError::Transport {
                operation,
                message: err.without_url().to_string(),
            })?;
        debug!(operation, status = status.as_u16(), "received response");
        wire::decode(operation, status, &body)
    }
}

fn create_params(request: &CreateRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("name", request.name.clone()),
        ("size_id", request.size_id.to_string()),
        ("image_id", request.image_id.to_string()),
        ("region_id", request.region_id.to_string()),
    ];
    if !request.ssh_key_ids.is_empty() {
        let joined = request
            .ssh_key_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        params.push(("ssh_key_ids", joined));
    }
    params.push(("virtio", request.virtio.to_string()));
    params.push(("private_networking", request.private_networking.to_string()));
    params.push(("backups_enabled", request.backups_enabled.to_string()));
    params
}

impl ProviderClient for DigitalOceanClient {
    type Error = DigitalOceanError;

    fn list_instances(&self) -> ProviderFuture<'_, Vec<Instance>, Self::Error> {
        Box::pin(async move {
            let body: DropletList<Instance> = self.get("list", "/droplets/", &[]).await?;
            Ok(body.droplets)
        })
    }

    fn create_instance<'a>(
        &'a self,
        request: &'a CreateRequest,
    ) -> ProviderFuture<'a, Instance, Self::Error> {
        Box::pin(async move {
            let params = create_params(request);
            let body: DropletBody<Instance> =
                self.get("create", "/droplets/new", &params).await?;
            Ok(body.droplet)
        })
    }

    fn fetch_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error> {
        Box::pin(async move {
            let path = format!("/droplets/{id}/");
            let body: DropletBody<InstanceAttributes> = self.get("fetch", &path, &[]).await?;
            Ok(body.droplet)
        })
    }

    fn power_on_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error> {
        Box::pin(async move {
            let path = format!("/droplets/{id}/power_on/");
            let mut body: Map<String, Value> = self.get("power_on", &path, &[]).await?;
            // The envelope status is not the droplet's status.
            body.remove("status");
            Ok(InstanceAttributes::new(body))
        })
    }

    fn destroy_instance(&self, id: InstanceId) -> ProviderFuture<'_, DestroyReceipt, Self::Error> {
        Box::pin(async move {
            let path = format!("/droplets/{id}/destroy/");
            let body: EventBody = self.get("destroy", &path, &[]).await?;
            Ok(DestroyReceipt {
                event_id: body.event_id,
            })
        })
    }
}
