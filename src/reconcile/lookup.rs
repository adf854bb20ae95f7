//! Matching of existing droplets against the caller's keys.

use crate::instance::{Instance, InstanceId};

/// Picks the droplet matching `id`, falling back to the first droplet named
/// `name`.
///
/// Provider ids are unique, so an id match wins outright. Names are not
/// unique on the provider side: when several droplets share `name`, the
/// first one in listing order is returned and the listing order is whatever
/// the provider chose.
#[must_use]
pub fn find_instance(
    instances: Vec<Instance>,
    id: Option<InstanceId>,
    name: Option<&str>,
) -> Option<Instance> {
    let position = id
        .and_then(|wanted| instances.iter().position(|instance| instance.id == wanted))
        .or_else(|| {
            name.and_then(|wanted| {
                instances
                    .iter()
                    .position(|instance| instance.name == wanted)
            })
        })?;
    instances.into_iter().nth(position)
}
