//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::clock::{Clock, SleepFuture};
use crate::instance::{Instance, InstanceAttributes, InstanceId};
use crate::provider::{CreateRequest, DestroyReceipt, ProviderClient, ProviderFuture};

/// Converts a snapshot into the attribute map a provider would return.
#[must_use]
pub fn attributes_of(instance: &Instance) -> InstanceAttributes {
    match serde_json::to_value(instance) {
        Ok(Value::Object(map)) => InstanceAttributes::new(map),
        _ => InstanceAttributes::default(),
    }
}

/// Provider call recorded by [`ScriptedProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// `list_instances`.
    List,
    /// `create_instance` with the request it received.
    Create(CreateRequest),
    /// `fetch_instance`.
    Fetch(InstanceId),
    /// `power_on_instance`.
    PowerOn(InstanceId),
    /// `destroy_instance`.
    Destroy(InstanceId),
}

/// Failure returned by [`ScriptedProvider`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted provider failure: {0}")]
pub struct ScriptedFailure(pub String);

#[derive(Debug, Default)]
struct Script {
    listing: Vec<Instance>,
    created: Option<Instance>,
    snapshots: VecDeque<InstanceAttributes>,
    last_snapshot: Option<InstanceAttributes>,
    power_on: Option<InstanceAttributes>,
    destroy_event: Option<u64>,
    failing: Option<String>,
    calls: Vec<ProviderCall>,
}

/// Provider double that replays scripted responses and records every call.
///
/// Snapshots returned by `fetch_instance` are served in FIFO order; once the
/// queue is drained the last one keeps being returned, which models a
/// droplet stuck in its final observed state.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// Creates a provider with an empty listing and nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the droplets returned by `list_instances`.
    #[must_use]
    pub fn with_listing(self, listing: Vec<Instance>) -> Self {
        self.script().listing = listing;
        self
    }

    /// Sets the droplet returned by `create_instance`.
    #[must_use]
    pub fn with_created(self, instance: Instance) -> Self {
        self.script().created = Some(instance);
        self
    }

    /// Queues a snapshot for `fetch_instance`.
    #[must_use]
    pub fn with_snapshot(self, instance: &Instance) -> Self {
        self.script().snapshots.push_back(attributes_of(instance));
        self
    }

    /// Sets the attributes returned by `power_on_instance`.
    #[must_use]
    pub fn with_power_on(self, attributes: InstanceAttributes) -> Self {
        self.script().power_on = Some(attributes);
        self
    }

    /// Sets the event id returned by `destroy_instance`.
    #[must_use]
    pub fn with_destroy_event(self, event_id: u64) -> Self {
        self.script().destroy_event = Some(event_id);
        self
    }

    /// Makes every subsequent call fail with `message`.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.script().failing = Some(message.into());
        self
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.script().calls.clone()
    }

    /// Returns `true` when any call mutated remote state.
    #[must_use]
    pub fn mutated(&self) -> bool {
        self.calls().iter().any(|call| {
            matches!(
                call,
                ProviderCall::Create(_) | ProviderCall::PowerOn(_) | ProviderCall::Destroy(_)
            )
        })
    }

    fn respond<T: Send + 'static>(
        &self,
        call: ProviderCall,
        answer: impl FnOnce(&mut Script) -> Option<T>,
        missing: &str,
    ) -> ProviderFuture<'_, T, ScriptedFailure> {
        let mut script = self.script();
        script.calls.push(call);
        let result = match script.failing.clone() {
            Some(message) => Err(ScriptedFailure(message)),
            None => answer(&mut *script).ok_or_else(|| ScriptedFailure(missing.to_owned())),
        };
        Box::pin(std::future::ready(result))
    }
}

impl ProviderClient for ScriptedProvider {
    type Error = ScriptedFailure;

    fn list_instances(&self) -> ProviderFuture<'_, Vec<Instance>, Self::Error> {
        self.respond(
            ProviderCall::List,
            |script| Some(script.listing.clone()),
            "no listing",
        )
    }

    fn create_instance<'a>(
        &'a self,
        request: &'a CreateRequest,
    ) -> ProviderFuture<'a, Instance, Self::Error> {
        self.respond(
            ProviderCall::Create(request.clone()),
            |script| script.created.clone(),
            "no create response scripted",
        )
    }

    fn fetch_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error> {
        self.respond(
            ProviderCall::Fetch(id),
            |script| {
                if let Some(next) = script.snapshots.pop_front() {
                    script.last_snapshot = Some(next);
                }
                script.last_snapshot.clone()
            },
            "no snapshot scripted",
        )
    }

    fn power_on_instance(
        &self,
        id: InstanceId,
    ) -> ProviderFuture<'_, InstanceAttributes, Self::Error> {
        self.respond(
            ProviderCall::PowerOn(id),
            |script| Some(script.power_on.clone().unwrap_or_default()),
            "no power-on response scripted",
        )
    }

    fn destroy_instance(&self, id: InstanceId) -> ProviderFuture<'_, DestroyReceipt, Self::Error> {
        self.respond(
            ProviderCall::Destroy(id),
            |script| script.destroy_event.map(|event_id| DestroyReceipt { event_id }),
            "no destroy response scripted",
        )
    }
}

#[derive(Debug, Default)]
struct FakeTime {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock: sleeping advances time instantly and is recorded.
#[derive(Clone, Debug)]
pub struct FakeClock {
    origin: Instant,
    time: Arc<Mutex<FakeTime>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            time: Arc::default(),
        }
    }
}

impl FakeClock {
    /// Creates a clock at an arbitrary origin with no time elapsed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn time(&self) -> MutexGuard<'_, FakeTime> {
        self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total virtual time slept so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.time().elapsed
    }

    /// Every sleep requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.time().sleeps.clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.time().elapsed
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        let mut time = self.time();
        time.elapsed += duration;
        time.sleeps.push(duration);
        Box::pin(std::future::ready(()))
    }
}
