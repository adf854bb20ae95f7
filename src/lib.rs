//! Core library for the Dropwarden droplet reconciler.
//!
//! The crate brings a DigitalOcean droplet to a desired state (present and
//! running with an address, or absent) and reports whether anything changed.
//! Provider access sits behind [`ProviderClient`] so the reconciliation loop
//! can be driven by the real v1 API client or by test doubles.

pub mod clock;
pub mod config;
pub mod digitalocean;
pub mod instance;
pub mod provider;
pub mod reconcile;
pub mod test_support;

pub use clock::{Clock, TokioClock};
pub use config::{ConfigError, ProviderConfig};
pub use digitalocean::{DigitalOceanClient, DigitalOceanError};
pub use instance::{Instance, InstanceAttributes, InstanceId, InstanceStatus};
pub use provider::{CreateRequest, CreateRequestBuilder, DestroyReceipt, ProviderClient};
pub use reconcile::{
    DesiredState, ReconcileDetail, ReconcileError, ReconcileRequest, ReconcileResult, Reconciler,
};
