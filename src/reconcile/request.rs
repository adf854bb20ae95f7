//! Caller intent and reconciliation outcome types.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::instance::{Instance, InstanceId};
use crate::provider::{CreateRequest, RequestError};

/// Default bound on the wait for a droplet to come up.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Message reported when an `absent` target does not exist.
pub const NOT_FOUND_MESSAGE: &str = "The droplet is not found.";

/// Existence state the caller wants the droplet to end up in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DesiredState {
    /// The droplet exists and is running with an address.
    #[default]
    Present,
    /// No matching droplet exists.
    Absent,
}

/// What the caller asks the reconciler to converge on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReconcileRequest {
    /// Desired end state.
    pub state: DesiredState,
    /// Provider identifier of an existing droplet.
    pub id: Option<InstanceId>,
    /// Droplet name, used for creation and, with `unique_name`, for lookup.
    pub name: Option<String>,
    /// Treat `name` as a unique key when looking up existing droplets.
    pub unique_name: bool,
    /// Size identifier for creation.
    pub size_id: Option<u64>,
    /// Image identifier for creation.
    pub image_id: Option<u64>,
    /// Region identifier for creation.
    pub region_id: Option<u64>,
    /// SSH keys installed on creation.
    pub ssh_key_ids: Vec<u64>,
    /// Boot with virtio drivers.
    pub virtio: bool,
    /// Attach a private network interface.
    pub private_networking: bool,
    /// Enable provider-side backups.
    pub backups_enabled: bool,
    /// Wait for the droplet to be running with an address.
    pub wait: bool,
    /// Upper bound on that wait.
    pub wait_timeout: Duration,
}

impl ReconcileRequest {
    /// Creates a request for `state` with every other field at its default.
    #[must_use]
    pub const fn new(state: DesiredState) -> Self {
        Self {
            state,
            id: None,
            name: None,
            unique_name: false,
            size_id: None,
            image_id: None,
            region_id: None,
            ssh_key_ids: Vec::new(),
            virtio: true,
            private_networking: false,
            backups_enabled: false,
            wait: true,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Returns the name when it is set and not blank.
    #[must_use]
    pub fn lookup_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Checks the field combinations every request must satisfy: at least
    /// one of `id`/`name`, the creation ids all present or all absent, and
    /// a `wait_timeout` that yields a representable deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Constraint`] describing the violated
    /// constraint.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.id.is_none() && self.lookup_name().is_none() {
            return Err(RequestError::Constraint(String::from(
                "one of id or name is required",
            )));
        }

        let sizing = [
            ("size_id", self.size_id),
            ("image_id", self.image_id),
            ("region_id", self.region_id),
        ];
        let missing: Vec<&str> = sizing
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() && missing.len() < sizing.len() {
            return Err(RequestError::Constraint(format!(
                "size_id, image_id and region_id must be given together; missing {}",
                missing.join(", ")
            )));
        }

        if self.wait && Instant::now().checked_add(self.wait_timeout).is_none() {
            return Err(RequestError::Constraint(format!(
                "wait_timeout of {}s is too large",
                self.wait_timeout.as_secs()
            )));
        }
        Ok(())
    }

    /// Builds the provider creation call from this request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingField`] naming the first missing
    /// creation field.
    pub fn create_request(&self) -> Result<CreateRequest, RequestError> {
        CreateRequest::builder()
            .name(self.name.clone())
            .size_id(self.size_id)
            .image_id(self.image_id)
            .region_id(self.region_id)
            .ssh_key_ids(self.ssh_key_ids.iter().copied())
            .virtio(self.virtio)
            .private_networking(self.private_networking)
            .backups_enabled(self.backups_enabled)
            .build()
    }
}

/// Outcome of one reconciliation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReconcileResult {
    /// Whether the reconciler had to act on the remote droplet.
    pub changed: bool,
    /// State-specific payload.
    #[serde(flatten)]
    pub detail: ReconcileDetail,
}

/// Payload attached to a [`ReconcileResult`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReconcileDetail {
    /// Final snapshot of a present droplet.
    Droplet {
        /// Every attribute the provider reported.
        droplet: Instance,
    },
    /// Destroy was accepted by the provider.
    Destroyed {
        /// Provider event tracking the teardown.
        event_id: u64,
    },
    /// Nothing matched an `absent` request.
    NotFound {
        /// Informational note.
        msg: String,
    },
}

impl ReconcileResult {
    /// Result for a present droplet.
    #[must_use]
    pub const fn droplet(changed: bool, droplet: Instance) -> Self {
        Self {
            changed,
            detail: ReconcileDetail::Droplet { droplet },
        }
    }

    /// Result for an accepted destroy.
    #[must_use]
    pub const fn destroyed(event_id: u64) -> Self {
        Self {
            changed: true,
            detail: ReconcileDetail::Destroyed { event_id },
        }
    }

    /// Result for an `absent` request with no matching droplet.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            changed: false,
            detail: ReconcileDetail::NotFound {
                msg: NOT_FOUND_MESSAGE.to_owned(),
            },
        }
    }

    /// Returns the droplet snapshot for present results.
    #[must_use]
    pub const fn instance(&self) -> Option<&Instance> {
        match &self.detail {
            ReconcileDetail::Droplet { droplet } => Some(droplet),
            ReconcileDetail::Destroyed { .. } | ReconcileDetail::NotFound { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn named(name: &str) -> ReconcileRequest {
        ReconcileRequest {
            name: Some(name.to_owned()),
            ..ReconcileRequest::new(DesiredState::Present)
        }
    }

    #[test]
    fn validate_requires_id_or_name() {
        let err = ReconcileRequest::new(DesiredState::Absent)
            .validate()
            .expect_err("id or name is required");
        assert!(err.to_string().contains("one of id or name"), "{err}");
    }

    #[test]
    fn constraint_messages_carry_no_field_prefix() {
        let err = ReconcileRequest::new(DesiredState::Absent)
            .validate()
            .expect_err("id or name is required");
        assert_eq!(err.to_string(), "one of id or name is required");
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn validate_rejects_unrepresentable_deadline_only_when_waiting(
        #[case] wait: bool,
        #[case] rejected: bool,
    ) {
        let request = ReconcileRequest {
            wait,
            wait_timeout: Duration::MAX,
            ..named("web1")
        };
        assert_eq!(request.validate().is_err(), rejected);
    }

    #[test]
    fn validate_treats_blank_name_as_missing() {
        let err = named("   ").validate().expect_err("blank name is not a key");
        assert!(err.to_string().contains("one of id or name"), "{err}");
    }

    #[rstest]
    #[case(Some(1), None, None, "image_id, region_id")]
    #[case(None, Some(3), None, "size_id, region_id")]
    #[case(Some(1), Some(3), None, "region_id")]
    fn validate_requires_sizing_fields_together(
        #[case] size_id: Option<u64>,
        #[case] image_id: Option<u64>,
        #[case] region_id: Option<u64>,
        #[case] missing: &str,
    ) {
        let request = ReconcileRequest {
            size_id,
            image_id,
            region_id,
            ..named("web1")
        };
        let err = request.validate().expect_err("partial sizing should fail");
        assert!(err.to_string().ends_with(missing), "{err}");
    }

    #[test]
    fn validate_accepts_id_without_sizing() {
        let request = ReconcileRequest {
            id: Some(42),
            ..ReconcileRequest::new(DesiredState::Absent)
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_request_forwards_options() {
        let request = ReconcileRequest {
            size_id: Some(66),
            image_id: Some(3),
            region_id: Some(2),
            ssh_key_ids: vec![5],
            virtio: false,
            backups_enabled: true,
            ..named("web1")
        };
        let create = request
            .create_request()
            .unwrap_or_else(|err| panic!("create request should build: {err}"));
        assert_eq!(create.size_id, 66);
        assert_eq!(create.ssh_key_ids, vec![5]);
        assert!(!create.virtio);
        assert!(create.backups_enabled);
    }

    #[test]
    fn results_serialise_as_flat_objects() {
        let destroyed = serde_json::to_value(ReconcileResult::destroyed(1895))
            .unwrap_or_else(|err| panic!("serialise: {err}"));
        assert_eq!(destroyed, json!({ "changed": true, "event_id": 1895 }));

        let missing = serde_json::to_value(ReconcileResult::not_found())
            .unwrap_or_else(|err| panic!("serialise: {err}"));
        assert_eq!(
            missing,
            json!({ "changed": false, "msg": "The droplet is not found." })
        );

        let present = serde_json::to_value(ReconcileResult::droplet(
            false,
            Instance::new(42, "web1", "active").with_ip_address("203.0.113.7"),
        ))
        .unwrap_or_else(|err| panic!("serialise: {err}"));
        assert_eq!(
            present,
            json!({
                "changed": false,
                "droplet": {
                    "id": 42,
                    "name": "web1",
                    "status": "active",
                    "ip_address": "203.0.113.7"
                }
            })
        );
    }
}
