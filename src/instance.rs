//! Droplet data model shared by the reconciler and provider clients.
//!
//! An [`Instance`] keeps the attributes the reconciler reasons about as typed
//! fields and carries every other provider attribute verbatim so the final
//! result payload reflects what the provider reported.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider-assigned droplet identifier.
pub type InstanceId = u64;

/// Power and provisioning status reported by the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    /// Freshly created and not yet booted.
    #[default]
    New,
    /// Powered off.
    Off,
    /// Powered on.
    Active,
    /// Any other provider-defined status, kept verbatim.
    Other(String),
}

impl InstanceStatus {
    /// Returns the provider's spelling of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Off => "off",
            Self::Active => "active",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "new" => Self::New,
            "off" => Self::Off,
            "active" => Self::Active,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for InstanceStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<InstanceStatus> for String {
    fn from(value: InstanceStatus) -> Self {
        match value {
            InstanceStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw attribute map returned by point lookups and actions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct InstanceAttributes(Map<String, Value>);

impl InstanceAttributes {
    /// Wraps a JSON object.
    #[must_use]
    pub const fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the populated `ip_address`, ignoring null and empty values.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.0
            .get("ip_address")
            .and_then(Value::as_str)
            .filter(|ip| !ip.is_empty())
    }

    /// Returns a single attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unwraps the underlying JSON object.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for InstanceAttributes {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Snapshot of one remote droplet.
///
/// `status == active` means the droplet is powered on, but it says nothing
/// about networking: `ip_address` must be checked separately.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Instance {
    /// Provider-assigned identifier, stable for the droplet's lifetime.
    pub id: InstanceId,
    /// User-chosen name. Not unique on the provider side.
    #[serde(default)]
    pub name: String,
    /// Current status. Create responses may omit it, in which case the
    /// droplet is treated as `new`.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Public address, populated once networking is provisioned.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Remaining provider attributes, preserved for the result payload.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Instance {
    /// Builds a snapshot with no provider-specific extras.
    #[must_use]
    pub fn new(id: InstanceId, name: impl Into<String>, status: impl Into<InstanceStatus>) -> Self {
        Self {
            id,
            name: name.into(),
            status: status.into(),
            ip_address: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the public address.
    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Returns `true` when the provider reports the droplet as running.
    #[must_use]
    pub fn is_powered_on(&self) -> bool {
        self.status == InstanceStatus::Active
    }

    /// Returns `true` when the droplet is switched off, as opposed to not yet
    /// booted.
    #[must_use]
    pub fn is_powered_off(&self) -> bool {
        self.status == InstanceStatus::Off
    }

    /// Returns the public address when one is populated.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|ip| !ip.is_empty())
    }

    /// Merges fresh provider attributes into the snapshot. Keys present in
    /// `attributes` win; everything else is kept.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the merged attributes no longer
    /// describe a droplet (for example a non-numeric `id`).
    pub fn merge(&mut self, attributes: InstanceAttributes) -> Result<(), serde_json::Error> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        current.extend(attributes.into_inner());
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}
