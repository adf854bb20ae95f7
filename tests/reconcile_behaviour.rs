//! Behavioural tests for droplet reconciliation against a scripted provider.

use std::time::Duration;

use dropwarden::reconcile::{NOT_FOUND_MESSAGE, ReconcileDetail};
use dropwarden::test_support::{FakeClock, ProviderCall, ScriptedProvider};
use dropwarden::{DesiredState, Instance, ReconcileError, ReconcileRequest, Reconciler};
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> FakeClock {
    FakeClock::new()
}

fn reconciler(
    provider: &ScriptedProvider,
    clock: &FakeClock,
) -> Reconciler<ScriptedProvider, FakeClock> {
    Reconciler::new(provider.clone()).with_clock(clock.clone())
}

fn running(id: u64, name: &str) -> Instance {
    Instance::new(id, name, "active").with_ip_address(format!("203.0.113.{id}"))
}

fn by_id(state: DesiredState, id: u64) -> ReconcileRequest {
    ReconcileRequest {
        id: Some(id),
        ..ReconcileRequest::new(state)
    }
}

fn create_web1(timeout: Duration) -> ReconcileRequest {
    ReconcileRequest {
        name: Some(String::from("web1")),
        size_id: Some(1),
        image_id: Some(3),
        region_id: Some(2),
        wait: true,
        wait_timeout: timeout,
        ..ReconcileRequest::new(DesiredState::Present)
    }
}

#[rstest]
#[tokio::test]
async fn present_is_idempotent_for_running_droplet(clock: FakeClock) {
    let provider =
        ScriptedProvider::new().with_listing(vec![running(7, "db"), running(42, "web1")]);

    let result = reconciler(&provider, &clock)
        .reconcile(&by_id(DesiredState::Present, 42))
        .await
        .unwrap_or_else(|err| panic!("running droplet should reconcile: {err}"));

    assert!(!result.changed);
    assert_eq!(result.instance().map(|droplet| droplet.id), Some(42));
    assert_eq!(provider.calls(), vec![ProviderCall::List]);
    assert!(!provider.mutated());
}

#[rstest]
#[tokio::test]
async fn creates_and_waits_until_running_with_address(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_created(Instance::new(7, "web1", "new"))
        .with_snapshot(&Instance::new(7, "web1", "new"))
        .with_snapshot(&Instance::new(7, "web1", "off"))
        .with_snapshot(&running(7, "web1"));

    let result = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::from_secs(60)))
        .await
        .unwrap_or_else(|err| panic!("droplet should come up: {err}"));

    assert!(result.changed);
    let droplet = result
        .instance()
        .unwrap_or_else(|| panic!("present result carries the droplet"));
    assert!(droplet.is_powered_on());
    assert_eq!(droplet.address(), Some("203.0.113.7"));

    let calls = provider.calls();
    let Some(ProviderCall::Create(request)) = calls.first() else {
        panic!("expected a create call first: {calls:?}");
    };
    assert_eq!(
        (request.name.as_str(), request.size_id, request.image_id, request.region_id),
        ("web1", 1, 3, 2)
    );
    assert_eq!(calls.len(), 4, "unexpected calls: {calls:?}");
    assert_eq!(clock.elapsed(), Duration::from_secs(60));
}

#[rstest]
#[tokio::test]
async fn times_out_when_address_never_appears(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_created(Instance::new(11, "web1", "new"))
        .with_snapshot(&Instance::new(11, "web1", "active"));

    let err = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::from_secs(60)))
        .await
        .expect_err("droplet never gets an address");

    assert!(err.is_timeout(), "unexpected error: {err}");
    assert_eq!(err.instance_id(), Some(11));
    assert_eq!(clock.elapsed(), Duration::from_secs(60));
}

#[rstest]
#[tokio::test]
async fn times_out_when_droplet_never_runs(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_created(Instance::new(12, "web1", "new"))
        .with_snapshot(&Instance::new(12, "web1", "off").with_ip_address("10.0.0.12"));

    let err = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::from_secs(45)))
        .await
        .expect_err("droplet stays off");

    let ReconcileError::Timeout {
        instance_id,
        ref message,
    } = err
    else {
        panic!("expected a timeout, got {err}");
    };
    assert_eq!(instance_id, 12);
    assert_eq!(message.as_str(), "timed out waiting for running state");
}

#[rstest]
#[tokio::test]
async fn absent_without_match_is_unchanged(clock: FakeClock) {
    let provider = ScriptedProvider::new().with_listing(vec![running(42, "web1")]);

    let result = reconciler(&provider, &clock)
        .reconcile(&by_id(DesiredState::Absent, 999))
        .await
        .unwrap_or_else(|err| panic!("missing droplet is not an error: {err}"));

    assert!(!result.changed);
    assert_eq!(
        result.detail,
        ReconcileDetail::NotFound {
            msg: NOT_FOUND_MESSAGE.to_owned()
        }
    );
    assert_eq!(provider.calls(), vec![ProviderCall::List]);
}

#[rstest]
#[tokio::test]
async fn absent_destroys_matching_droplet(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_listing(vec![running(42, "web1")])
        .with_destroy_event(1895);

    let result = reconciler(&provider, &clock)
        .reconcile(&by_id(DesiredState::Absent, 42))
        .await
        .unwrap_or_else(|err| panic!("destroy should succeed: {err}"));

    assert!(result.changed);
    assert_eq!(result.detail, ReconcileDetail::Destroyed { event_id: 1895 });
    assert_eq!(
        provider.calls(),
        vec![ProviderCall::List, ProviderCall::Destroy(42)]
    );
    assert!(clock.sleeps().is_empty());
}

#[rstest]
#[tokio::test]
async fn unique_name_falls_back_to_name_match(clock: FakeClock) {
    let provider =
        ScriptedProvider::new().with_listing(vec![running(9, "web1"), running(10, "web1")]);
    let request = ReconcileRequest {
        id: Some(5),
        unique_name: true,
        ..create_web1(Duration::from_secs(60))
    };

    let result = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .unwrap_or_else(|err| panic!("name match should be reused: {err}"));

    assert!(!result.changed);
    assert_eq!(result.instance().map(|droplet| droplet.id), Some(9));
    assert_eq!(provider.calls(), vec![ProviderCall::List]);
}

#[rstest]
#[tokio::test]
async fn absent_by_unique_name_destroys_match(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_listing(vec![running(9, "web1")])
        .with_destroy_event(3);
    let request = ReconcileRequest {
        name: Some(String::from("web1")),
        unique_name: true,
        ..ReconcileRequest::new(DesiredState::Absent)
    };

    let result = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .unwrap_or_else(|err| panic!("destroy should succeed: {err}"));

    assert_eq!(result.detail, ReconcileDetail::Destroyed { event_id: 3 });
}

#[rstest]
#[tokio::test]
async fn name_is_ignored_for_lookup_without_unique_name(clock: FakeClock) {
    let provider = ScriptedProvider::new()
        .with_listing(vec![running(9, "web1")])
        .with_created(running(20, "web1"));

    let result = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::from_secs(60)))
        .await
        .unwrap_or_else(|err| panic!("creation should succeed: {err}"));

    assert_eq!(result.instance().map(|droplet| droplet.id), Some(20));
    assert!(matches!(
        provider.calls().as_slice(),
        [ProviderCall::Create(_)]
    ));
}

#[rstest]
#[tokio::test]
async fn created_droplet_already_running_is_reported_unchanged(clock: FakeClock) {
    let provider = ScriptedProvider::new().with_created(running(21, "web1"));

    let result = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::from_secs(60)))
        .await
        .unwrap_or_else(|err| panic!("creation should succeed: {err}"));

    // `changed` tracks whether a power-on was needed, not whether a droplet
    // was created.
    assert!(!result.changed);
    assert!(matches!(
        provider.calls().as_slice(),
        [ProviderCall::Create(_)]
    ));
}

#[rstest]
#[tokio::test]
async fn partial_sizing_fails_before_any_provider_call(clock: FakeClock) {
    let provider = ScriptedProvider::new();
    let request = ReconcileRequest {
        name: Some(String::from("web1")),
        size_id: Some(1),
        ..ReconcileRequest::new(DesiredState::Present)
    };

    let err = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .expect_err("image and region are missing");

    assert!(
        matches!(err, ReconcileError::Validation(_)),
        "unexpected error: {err}"
    );
    assert!(provider.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn creation_without_sizing_reports_missing_field(clock: FakeClock) {
    let provider = ScriptedProvider::new();
    let request = ReconcileRequest {
        name: Some(String::from("web1")),
        unique_name: true,
        ..ReconcileRequest::new(DesiredState::Present)
    };

    let err = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .expect_err("creation needs sizing");

    assert!(
        matches!(err, ReconcileError::Validation(_)),
        "unexpected error: {err}"
    );
    assert_eq!(
        err.to_string(),
        "invalid request: missing or empty field: size_id"
    );
    assert_eq!(provider.calls(), vec![ProviderCall::List]);
}

#[rstest]
#[tokio::test]
async fn creation_without_name_names_the_missing_field(clock: FakeClock) {
    let provider = ScriptedProvider::new().with_listing(vec![running(9, "web1")]);
    let request = ReconcileRequest {
        id: Some(5),
        name: None,
        ..create_web1(Duration::from_secs(60))
    };

    let err = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .expect_err("creation needs a name");

    assert_eq!(err.to_string(), "invalid request: missing or empty field: name");
    assert!(!provider.mutated());
}

#[rstest]
#[tokio::test]
async fn overflowing_wait_timeout_fails_before_any_provider_call(clock: FakeClock) {
    let provider = ScriptedProvider::new().with_created(Instance::new(31, "web1", "new"));

    let err = reconciler(&provider, &clock)
        .reconcile(&create_web1(Duration::MAX))
        .await
        .expect_err("deadline cannot be represented");

    assert!(
        matches!(err, ReconcileError::Validation(ref message) if message.contains("wait_timeout")),
        "unexpected error: {err}"
    );
    assert!(provider.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn provider_failures_propagate_verbatim(clock: FakeClock) {
    let provider = ScriptedProvider::new().failing("Invalid API key");

    let err = reconciler(&provider, &clock)
        .reconcile(&by_id(DesiredState::Absent, 42))
        .await
        .expect_err("listing fails");

    assert_eq!(err.to_string(), "scripted provider failure: Invalid API key");
    assert_eq!(err.instance_id(), None);
}

#[rstest]
#[tokio::test]
async fn no_wait_returns_without_polling(clock: FakeClock) {
    let provider = ScriptedProvider::new().with_created(Instance::new(30, "web1", "new"));
    let request = ReconcileRequest {
        wait: false,
        ..create_web1(Duration::from_secs(60))
    };

    let result = reconciler(&provider, &clock)
        .reconcile(&request)
        .await
        .unwrap_or_else(|err| panic!("no-wait creation should succeed: {err}"));

    assert!(result.changed);
    assert_eq!(result.instance().and_then(Instance::address), None);
    assert!(clock.sleeps().is_empty());
}
