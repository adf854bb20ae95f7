//! Idempotent reconciliation of a droplet against the caller's intent.
//!
//! The reconciler rediscovers the droplet on every run (by id, then by name
//! when the caller opts in), creates it when missing, and waits with a
//! deadline-bounded poll until it runs with an address. `absent` requests
//! destroy the match, if any, without waiting for it to disappear.

mod error;
mod lookup;
mod request;
mod wait;

use std::time::Duration;

use tracing::info;

use crate::clock::{Clock, TokioClock};
use crate::instance::Instance;
use crate::provider::ProviderClient;

pub use error::ReconcileError;
pub use lookup::find_instance;
pub use request::{
    DEFAULT_WAIT_TIMEOUT, DesiredState, NOT_FOUND_MESSAGE, ReconcileDetail, ReconcileRequest,
    ReconcileResult,
};

/// Longest sleep between two status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Converges one droplet on a [`ReconcileRequest`].
#[derive(Clone, Debug)]
pub struct Reconciler<P, C = TokioClock> {
    provider: P,
    clock: C,
    poll_interval: Duration,
}

impl<P> Reconciler<P, TokioClock> {
    /// Creates a reconciler on the wall clock.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            clock: TokioClock,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl<P, C> Reconciler<P, C> {
    /// Replaces the clock used by the poll loop.
    #[must_use]
    pub fn with_clock<D>(self, clock: D) -> Reconciler<P, D> {
        Reconciler {
            provider: self.provider,
            clock,
            poll_interval: self.poll_interval,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl<P, C> Reconciler<P, C>
where
    P: ProviderClient,
    C: Clock,
{
    /// Dispatches on [`ReconcileRequest::state`].
    ///
    /// # Errors
    ///
    /// See [`Self::reconcile_present`] and [`Self::reconcile_absent`].
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError<P::Error>> {
        match request.state {
            DesiredState::Present => self.reconcile_present(request).await,
            DesiredState::Absent => self.reconcile_absent(request).await,
        }
    }

    /// Ensures a matching droplet exists and is running.
    ///
    /// `changed` reports whether the droplet was short of the running state
    /// before any power-on, not whether it was created: a droplet that comes
    /// back from creation already `active` is reported unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Validation`] when the request is incomplete
    /// (creation needs `name`, `size_id`, `image_id`, and `region_id`),
    /// [`ReconcileError::Provider`] when a provider call fails, and
    /// [`ReconcileError::Timeout`] when the droplet does not come up in time.
    pub async fn reconcile_present(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError<P::Error>> {
        request.validate()?;

        let mut instance = match self.find(request).await? {
            Some(existing) => existing,
            None => {
                let create = request.create_request()?;
                info!(
                    name = %create.name,
                    size_id = create.size_id,
                    image_id = create.image_id,
                    region_id = create.region_id,
                    "creating droplet"
                );
                let created = self
                    .provider
                    .create_instance(&create)
                    .await
                    .map_err(ReconcileError::Provider)?;
                info!(droplet_id = created.id, status = %created.status, "droplet created");
                created
            }
        };

        let changed = !instance.is_powered_on();
        self.ensure_powered_on(&mut instance, request.wait, request.wait_timeout)
            .await?;
        Ok(ReconcileResult::droplet(changed, instance))
    }

    /// Destroys the matching droplet, if there is one.
    ///
    /// A missing droplet is a success with `changed == false`. The destroy is
    /// not awaited; the provider's event id is returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Validation`] when the request names no
    /// droplet and [`ReconcileError::Provider`] when a provider call fails.
    pub async fn reconcile_absent(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError<P::Error>> {
        request.validate()?;

        let Some(instance) = self.find(request).await? else {
            info!(id = ?request.id, name = ?request.name, "droplet not found; nothing to destroy");
            return Ok(ReconcileResult::not_found());
        };

        info!(droplet_id = instance.id, name = %instance.name, "destroying droplet");
        let receipt = self
            .provider
            .destroy_instance(instance.id)
            .await
            .map_err(ReconcileError::Provider)?;
        Ok(ReconcileResult::destroyed(receipt.event_id))
    }

    /// Looks up the droplet by id, then by name when `unique_name` is set.
    /// Skips the listing call entirely when neither key applies.
    async fn find(
        &self,
        request: &ReconcileRequest,
    ) -> Result<Option<Instance>, ReconcileError<P::Error>> {
        let name = request.lookup_name().filter(|_| request.unique_name);
        if request.id.is_none() && name.is_none() {
            return Ok(None);
        }

        let instances = self
            .provider
            .list_instances()
            .await
            .map_err(ReconcileError::Provider)?;
        let found = find_instance(instances, request.id, name);
        if let Some(instance) = &found {
            info!(
                droplet_id = instance.id,
                name = %instance.name,
                status = %instance.status,
                "found existing droplet"
            );
        }
        Ok(found)
    }
}
