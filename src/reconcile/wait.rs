//! Power-on and the deadline-bounded wait for a usable droplet.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::instance::{Instance, InstanceAttributes};
use crate::provider::ProviderClient;

use super::{ReconcileError, Reconciler};

const RUNNING_TIMEOUT_MESSAGE: &str = "timed out waiting for running state";
const MISSING_IP_MESSAGE: &str = "no ip found";

impl<P, C> Reconciler<P, C>
where
    P: ProviderClient,
    C: Clock,
{
    /// Brings `instance` to the running state.
    ///
    /// A droplet that is `off` gets a power-on call; one that is still `new`
    /// is left to finish booting. Without `wait` the call returns straight
    /// after that, whatever the actual state. With `wait` the droplet is
    /// re-fetched every poll interval (shortened to the time left) until it
    /// runs or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Timeout`] when the deadline passes, or when
    /// the droplet runs without an address; [`ReconcileError::Provider`]
    /// when any provider call fails.
    pub async fn ensure_powered_on(
        &self,
        instance: &mut Instance,
        wait: bool,
        timeout: Duration,
    ) -> Result<(), ReconcileError<P::Error>> {
        if instance.is_powered_on() {
            return Ok(());
        }

        if instance.is_powered_off() {
            info!(droplet_id = instance.id, "powering on droplet");
            let attributes = self
                .provider
                .power_on_instance(instance.id)
                .await
                .map_err(ReconcileError::Provider)?;
            merge(instance, attributes)?;
        }

        if !wait {
            return Ok(());
        }

        let deadline = self
            .clock
            .now()
            .checked_add(timeout)
            .ok_or_else(|| {
                ReconcileError::Validation(String::from("wait_timeout is too large"))
            })?;

        loop {
            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                break;
            }
            self.clock.sleep(self.poll_interval.min(remaining)).await;
            self.refresh(instance).await?;

            if instance.is_powered_on() {
                if instance.address().is_none() {
                    warn!(droplet_id = instance.id, "droplet is running without an address");
                    return Err(ReconcileError::Timeout {
                        instance_id: instance.id,
                        message: MISSING_IP_MESSAGE.to_owned(),
                    });
                }
                info!(
                    droplet_id = instance.id,
                    ip_address = instance.address().unwrap_or_default(),
                    "droplet is running"
                );
                return Ok(());
            }
        }

        warn!(droplet_id = instance.id, status = %instance.status, "gave up waiting for droplet");
        Err(ReconcileError::Timeout {
            instance_id: instance.id,
            message: RUNNING_TIMEOUT_MESSAGE.to_owned(),
        })
    }

    /// Re-fetches the droplet. Snapshots without an address are discarded so
    /// a complete snapshot is never replaced by a partial one.
    async fn refresh(&self, instance: &mut Instance) -> Result<(), ReconcileError<P::Error>> {
        let attributes = self
            .provider
            .fetch_instance(instance.id)
            .await
            .map_err(ReconcileError::Provider)?;
        if attributes.ip_address().is_none() {
            debug!(
                droplet_id = instance.id,
                "snapshot has no address yet; keeping previous one"
            );
            return Ok(());
        }
        merge(instance, attributes)?;
        debug!(droplet_id = instance.id, status = %instance.status, "refreshed droplet");
        Ok(())
    }
}

fn merge<E>(
    instance: &mut Instance,
    attributes: InstanceAttributes,
) -> Result<(), ReconcileError<E>>
where
    E: std::error::Error + 'static,
{
    let instance_id = instance.id;
    instance
        .merge(attributes)
        .map_err(|err| ReconcileError::MalformedAttributes {
            instance_id,
            message: err.to_string(),
        })
}
