//! Provider abstraction for listing, creating, powering on, and destroying
//! droplets.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::instance::{Instance, InstanceAttributes, InstanceId};

/// Parameters required to create a new droplet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateRequest {
    /// Name given to the new droplet.
    pub name: String,
    /// Provider size identifier.
    pub size_id: u64,
    /// Provider image identifier.
    pub image_id: u64,
    /// Provider region identifier.
    pub region_id: u64,
    /// SSH keys installed on first boot.
    pub ssh_key_ids: Vec<u64>,
    /// Whether to boot with virtio drivers.
    pub virtio: bool,
    /// Whether to attach a private network interface.
    pub private_networking: bool,
    /// Whether to enable provider-side backups.
    pub backups_enabled: bool,
}

impl CreateRequest {
    /// Starts a builder for a [`CreateRequest`].
    #[must_use]
    pub fn builder() -> CreateRequestBuilder {
        CreateRequestBuilder::new()
    }
}

/// Builder for [`CreateRequest`] that reports the first missing field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateRequestBuilder {
    name: Option<String>,
    size_id: Option<u64>,
    image_id: Option<u64>,
    region_id: Option<u64>,
    ssh_key_ids: Vec<u64>,
    virtio: bool,
    private_networking: bool,
    backups_enabled: bool,
}

impl Default for CreateRequestBuilder {
    fn default() -> Self {
        Self {
            name: None,
            size_id: None,
            image_id: None,
            region_id: None,
            ssh_key_ids: Vec::new(),
            virtio: true,
            private_networking: false,
            backups_enabled: false,
        }
    }
}

impl CreateRequestBuilder {
    /// Creates an empty builder; `virtio` defaults to enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the droplet name.
    #[must_use]
    pub fn name(mut self, value: Option<impl Into<String>>) -> Self {
        self.name = value.map(Into::into);
        self
    }

    /// Sets the size identifier.
    #[must_use]
    pub const fn size_id(mut self, value: Option<u64>) -> Self {
        self.size_id = value;
        self
    }

    /// Sets the image identifier.
    #[must_use]
    pub const fn image_id(mut self, value: Option<u64>) -> Self {
        self.image_id = value;
        self
    }

    /// Sets the region identifier.
    #[must_use]
    pub const fn region_id(mut self, value: Option<u64>) -> Self {
        self.region_id = value;
        self
    }

    /// Sets the SSH key identifiers.
    #[must_use]
    pub fn ssh_key_ids(mut self, value: impl IntoIterator<Item = u64>) -> Self {
        self.ssh_key_ids = value.into_iter().collect();
        self
    }

    /// Enables or disables virtio.
    #[must_use]
    pub const fn virtio(mut self, value: bool) -> Self {
        self.virtio = value;
        self
    }

    /// Enables or disables private networking.
    #[must_use]
    pub const fn private_networking(mut self, value: bool) -> Self {
        self.private_networking = value;
        self
    }

    /// Enables or disables backups.
    #[must_use]
    pub const fn backups_enabled(mut self, value: bool) -> Self {
        self.backups_enabled = value;
        self
    }

    /// Builds the [`CreateRequest`], trimming the name.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingField`] naming the first of `name`,
    /// `size_id`, `image_id`, or `region_id` that is missing or blank.
    pub fn build(self) -> Result<CreateRequest, RequestError> {
        let name = self
            .name
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| RequestError::MissingField("name"))?;
        let size_id = self
            .size_id
            .ok_or_else(|| RequestError::MissingField("size_id"))?;
        let image_id = self
            .image_id
            .ok_or_else(|| RequestError::MissingField("image_id"))?;
        let region_id = self
            .region_id
            .ok_or_else(|| RequestError::MissingField("region_id"))?;
        Ok(CreateRequest {
            name,
            size_id,
            image_id,
            region_id,
            ssh_key_ids: self.ssh_key_ids,
            virtio: self.virtio,
            private_networking: self.private_networking,
            backups_enabled: self.backups_enabled,
        })
    }
}

/// Acknowledgement returned when a destroy is accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DestroyReceipt {
    /// Provider event tracking the asynchronous teardown.
    pub event_id: u64,
}

/// Errors raised while assembling provider requests.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a creation field is missing or blank.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    /// Raised when fields are combined in an unsupported way.
    #[error("{0}")]
    Constraint(String),
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Remote API capable of managing droplets.
///
/// Every call is a single request; implementations do not retry.
pub trait ProviderClient {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every droplet visible to the authenticated account.
    fn list_instances(&self) -> ProviderFuture<'_, Vec<Instance>, Self::Error>;

    /// Creates a droplet and returns its initial attributes.
    fn create_instance<'a>(
        &'a self,
        request: &'a CreateRequest,
    ) -> ProviderFuture<'a, Instance, Self::Error>;

    /// Fetches the current attributes of one droplet.
    fn fetch_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error>;

    /// Requests power-on and returns the attributes reported by the provider.
    fn power_on_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error>;

    /// Requests destruction of one droplet.
    fn destroy_instance(&self, id: InstanceId) -> ProviderFuture<'_, DestroyReceipt, Self::Error>;
}
