//! Tests for the toggle controller: window transitions, launch outcomes and
//! bus wiring.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tokio::sync::Notify;

use super::fixtures::{
    BrokerOutcome, FOO_APP, FakeBroker, FakeLauncher, Harness, WindowEvent, scoped,
};
use crate::bus::EventBus;
use crate::controller::{ControllerOptions, ToggleController};
use crate::error::LaunchError;
use crate::pipeline::Continuations;
use dock_types::{DockEntry, DockEvent, DockStatus, LaunchTarget, WindowId};

type Controller = ToggleController<super::fixtures::FakeWindowFactory>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    /// Success continuation ran; records whether the dock was still open
    Success { window_open: bool },
    Failure(LaunchError),
}

#[derive(Clone, Default)]
struct OutcomeLog(Arc<Mutex<Vec<Outcome>>>);

impl OutcomeLog {
    fn continuations(&self) -> Continuations<Controller> {
        let success = self.0.clone();
        let failure = self.0.clone();
        Continuations::new(
            move |controller: &mut Controller| {
                success.lock().unwrap().push(Outcome::Success {
                    window_open: controller.is_open(),
                });
            },
            move |_, err| failure.lock().unwrap().push(Outcome::Failure(err)),
        )
    }

    fn get(&self) -> Vec<Outcome> {
        self.0.lock().unwrap().clone()
    }
}

fn open_app(name: &str, url: &str) -> DockEvent {
    DockEvent::OpenApp {
        entry: DockEntry::new(name, url),
    }
}

// ---------------------------------------------------------------------------
// Window transitions
// ---------------------------------------------------------------------------

#[test]
fn test_toggle_opens_when_closed() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    assert!(!h.controller.is_open());

    h.controller.toggle();

    assert!(h.controller.is_open());
    assert_eq!(h.controller.dock().anchor(), Some(WindowId(1)));
    assert_eq!(
        h.window_events(),
        vec![WindowEvent::Created(1), WindowEvent::Shown(1)]
    );
}

#[test]
fn test_toggle_closes_when_open() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();

    h.controller.toggle();

    assert!(!h.controller.is_open());
    assert_eq!(h.controller.dock().anchor(), None);
    assert_eq!(h.window_events().last(), Some(&WindowEvent::Closed(1)));
}

#[test]
fn test_toggle_reopen_uses_new_window() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();
    h.controller.toggle();
    h.controller.toggle();

    assert_eq!(h.controller.dock().anchor(), Some(WindowId(2)));
}

proptest! {
    #[test]
    fn prop_toggle_parity(count in 0usize..40) {
        let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
        for _ in 0..count {
            h.controller.toggle();
        }

        prop_assert_eq!(h.controller.is_open(), count % 2 == 1);

        let events = h.window_events();
        let created = events.iter().filter(|e| matches!(e, WindowEvent::Created(_))).count();
        let closed = events.iter().filter(|e| matches!(e, WindowEvent::Closed(_))).count();
        prop_assert_eq!(created, count.div_ceil(2));
        prop_assert_eq!(closed, count / 2);
    }
}

// ---------------------------------------------------------------------------
// Launch outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_launch_success_runs_success_then_closes() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    assert!(h.controller.launch_in_flight());
    assert!(h.controller.process_next().await);

    assert_eq!(outcomes.get(), vec![Outcome::Success { window_open: true }]);
    assert!(!h.controller.is_open());
    assert!(!h.controller.launch_in_flight());
    assert_eq!(h.window_events().last(), Some(&WindowEvent::Closed(1)));
}

#[tokio::test]
async fn test_launch_success_resolves_inside_grant() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    let requests = h.broker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, PathBuf::from("/Apps"));

    let launched = h.launcher.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].0, scoped(&PathBuf::from(FOO_APP)));
    assert!(launched[0].1.activates);
}

#[tokio::test]
async fn test_launch_success_with_dock_closed_stays_closed() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    assert_eq!(outcomes.get(), vec![Outcome::Success { window_open: false }]);
    assert!(!h.controller.is_open());
    assert!(h.window_events().is_empty());
}

#[tokio::test]
async fn test_access_denied_fails_and_keeps_window() {
    let mut h = Harness::new(FakeBroker::denying(), FakeLauncher::succeeding());
    h.controller.toggle();
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    let result = outcomes.get();
    assert_eq!(
        result,
        vec![Outcome::Failure(LaunchError::AccessDenied(PathBuf::from(
            "/Apps"
        )))]
    );
    let Outcome::Failure(err) = &result[0] else {
        unreachable!()
    };
    assert!(err.is_permission_error());

    assert!(h.controller.is_open());
    assert_eq!(h.launcher.launch_count(), 0);
    assert!(
        !h.window_events()
            .iter()
            .any(|e| matches!(e, WindowEvent::Closed(_)))
    );
}

#[tokio::test]
async fn test_access_denied_with_dock_closed_stays_closed() {
    let mut h = Harness::new(FakeBroker::denying(), FakeLauncher::succeeding());
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    assert!(matches!(
        outcomes.get().as_slice(),
        [Outcome::Failure(LaunchError::AccessDenied(_))]
    ));
    assert!(!h.controller.is_open());
}

#[tokio::test]
async fn test_missing_location_never_reaches_broker() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::default(), outcomes.continuations());
    h.controller.process_next().await;

    assert_eq!(
        outcomes.get(),
        vec![Outcome::Failure(LaunchError::MissingTargetLocation)]
    );
    assert_eq!(h.broker.request_count(), 0);
    assert_eq!(h.launcher.launch_count(), 0);
    assert!(h.controller.is_open());
}

#[tokio::test]
async fn test_launcher_failure_reports_location() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::failing("no such app"));
    h.controller.toggle();
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    assert_eq!(
        outcomes.get(),
        vec![Outcome::Failure(LaunchError::LaunchFailure {
            location: scoped(&PathBuf::from(FOO_APP)),
            message: "no such app".to_string(),
        })]
    );
    assert!(h.controller.is_open());
}

#[tokio::test]
async fn test_every_outcome_resolves_exactly_once() {
    let cases = [
        (FakeBroker::granting(), FakeLauncher::succeeding(), LaunchTarget::new(FOO_APP)),
        (FakeBroker::denying(), FakeLauncher::succeeding(), LaunchTarget::new(FOO_APP)),
        (
            FakeBroker::new(BrokerOutcome::Fail("offline".to_string())),
            FakeLauncher::succeeding(),
            LaunchTarget::new(FOO_APP),
        ),
        (FakeBroker::granting(), FakeLauncher::failing("boom"), LaunchTarget::new(FOO_APP)),
        (FakeBroker::granting(), FakeLauncher::succeeding(), LaunchTarget::default()),
        (FakeBroker::granting(), FakeLauncher::succeeding(), LaunchTarget::new("Foo.app")),
    ];

    for (broker, launcher, target) in cases {
        let mut h = Harness::new(broker, launcher);
        let outcomes = OutcomeLog::default();

        h.controller.launch_application(target, outcomes.continuations());
        h.controller.process_next().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.controller.run_pending(), 0);

        assert_eq!(outcomes.get().len(), 1);
        assert!(!h.controller.launch_in_flight());
    }
}

#[tokio::test]
async fn test_each_attempt_requests_its_own_grant() {
    let mut h = Harness::new(
        FakeBroker::scripted([BrokerOutcome::Grant, BrokerOutcome::Deny]),
        FakeLauncher::succeeding(),
    );
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;
    h.controller.launch_application(
        LaunchTarget::new("/Other/Bar.app"),
        outcomes.continuations(),
    );
    h.controller.process_next().await;

    let directories: Vec<PathBuf> = h.broker.requests().into_iter().map(|(d, _)| d).collect();
    assert_eq!(directories, vec![PathBuf::from("/Apps"), PathBuf::from("/Other")]);
    assert_eq!(
        outcomes.get(),
        vec![
            Outcome::Success { window_open: false },
            Outcome::Failure(LaunchError::AccessDenied(PathBuf::from("/Other"))),
        ]
    );
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_access_request_is_anchored_to_open_window() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), Continuations::ignore());
    h.controller.process_next().await;

    let request = h.broker.requests()[0].1;
    assert_eq!(request.anchor, Some(WindowId(1)));
    assert!(request.ask_if_needed);
    assert!(request.persist);
}

#[tokio::test]
async fn test_access_request_without_window_has_no_anchor() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), Continuations::ignore());
    h.controller.process_next().await;

    assert_eq!(h.broker.requests()[0].1.anchor, None);
}

#[tokio::test]
async fn test_toggle_while_launch_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut h = Harness::new(
        FakeBroker::granting().gated(gate.clone()),
        FakeLauncher::succeeding(),
    );
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.toggle();
    assert!(h.controller.is_open());
    assert!(h.controller.launch_in_flight());

    gate.notify_one();
    h.controller.process_next().await;

    assert_eq!(outcomes.get(), vec![Outcome::Success { window_open: true }]);
    assert!(!h.controller.is_open());
}

// ---------------------------------------------------------------------------
// Overlapping launches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_second_launch_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut h = Harness::new(
        FakeBroker::granting().gated(gate.clone()),
        FakeLauncher::succeeding(),
    );
    let first = OutcomeLog::default();
    let second = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), first.continuations());
    h.controller.launch_application(
        LaunchTarget::new("/Apps/Bar.app"),
        second.continuations(),
    );

    // Rejection is delivered through the queue, not inline
    assert!(second.get().is_empty());
    h.controller.process_next().await;
    assert_eq!(second.get(), vec![Outcome::Failure(LaunchError::InFlight)]);
    assert!(first.get().is_empty());

    gate.notify_one();
    h.controller.process_next().await;
    assert_eq!(first.get(), vec![Outcome::Success { window_open: false }]);
    assert_eq!(h.broker.request_count(), 1);
}

#[tokio::test]
async fn test_launch_accepted_after_previous_finishes() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let outcomes = OutcomeLog::default();

    for _ in 0..2 {
        h.controller
            .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
        h.controller.process_next().await;
    }

    assert_eq!(outcomes.get().len(), 2);
    assert!(
        outcomes
            .get()
            .iter()
            .all(|o| matches!(o, Outcome::Success { .. }))
    );
}

#[tokio::test]
async fn test_crashed_attempt_fails_and_frees_the_slot() {
    let mut h = Harness::new(
        FakeBroker::scripted([BrokerOutcome::Panic]),
        FakeLauncher::succeeding(),
    );
    let outcomes = OutcomeLog::default();
    h.controller.toggle();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    assert!(matches!(
        outcomes.get().as_slice(),
        [Outcome::Failure(LaunchError::LaunchFailure { location, .. })]
            if *location == PathBuf::from(FOO_APP)
    ));
    assert!(!h.controller.launch_in_flight());
    assert!(h.controller.is_open());

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.process_next().await;

    assert_eq!(
        outcomes.get().last(),
        Some(&Outcome::Success { window_open: true })
    );
    assert!(!h.controller.is_open());
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_overlapping_launches_when_allowed() {
    let mut h = Harness::with_options(
        FakeBroker::granting(),
        FakeLauncher::succeeding(),
        ControllerOptions {
            allow_overlapping: true,
        },
    );
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.launch_application(
        LaunchTarget::new("/Apps/Bar.app"),
        outcomes.continuations(),
    );
    assert!(h.controller.launch_in_flight());

    h.controller.process_next().await;
    h.controller.process_next().await;

    assert_eq!(outcomes.get().len(), 2);
    assert!(!h.controller.launch_in_flight());
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test]
async fn test_outcome_dropped_when_controller_gone() {
    let gate = Arc::new(Notify::new());
    let mut h = Harness::new(
        FakeBroker::granting().gated(gate.clone()),
        FakeLauncher::succeeding(),
    );
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    drop(h.controller);

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(outcomes.get().is_empty());
}

// ---------------------------------------------------------------------------
// Bus wiring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bus_event_launches_and_closes() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    h.controller.toggle();

    assert_eq!(h.bus.publish(&open_app("Foo", FOO_APP)), 1);
    // Event hand-off, then the launch outcome
    h.controller.process_next().await;
    h.controller.process_next().await;

    assert!(!h.controller.is_open());
    assert_eq!(h.launcher.launch_count(), 1);
    assert!(h.reporter.reports().is_empty());
}

#[tokio::test]
async fn test_bus_event_failure_goes_to_reporter() {
    let mut h = Harness::new(FakeBroker::denying(), FakeLauncher::succeeding());
    h.controller.start();
    h.controller.toggle();

    h.bus.publish(&open_app("Foo", FOO_APP));
    h.controller.process_next().await;
    h.controller.process_next().await;

    let reports = h.reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, LaunchTarget::new(FOO_APP));
    assert_eq!(reports[0].1, LaunchError::AccessDenied(PathBuf::from("/Apps")));
    assert!(h.controller.is_open());
}

#[tokio::test]
async fn test_bus_event_for_unresolved_entry() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();

    h.bus.publish(&DockEvent::OpenApp {
        entry: DockEntry::unresolved("Ghost"),
    });
    h.controller.process_next().await;
    h.controller.process_next().await;

    assert_eq!(
        h.reporter.reports(),
        vec![(LaunchTarget::default(), LaunchError::MissingTargetLocation)]
    );
    assert_eq!(h.broker.request_count(), 0);
}

#[test]
fn test_start_is_idempotent() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    h.controller.start();

    assert!(h.controller.is_started());
    assert_eq!(h.bus.subscriber_count(), 1);
}

#[test]
fn test_stop_unsubscribes() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    h.controller.stop();

    assert!(!h.controller.is_started());
    assert_eq!(h.bus.subscriber_count(), 0);
    assert_eq!(h.bus.publish(&open_app("Foo", FOO_APP)), 0);
}

#[test]
fn test_drop_unsubscribes() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    let bus = h.bus.clone();

    drop(h);

    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn test_launch_in_flight_survives_stop() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    let outcomes = OutcomeLog::default();

    h.controller
        .launch_application(LaunchTarget::new(FOO_APP), outcomes.continuations());
    h.controller.stop();
    h.controller.process_next().await;

    assert_eq!(outcomes.get().len(), 1);
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handle_toggle_runs_on_home() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let handle = h.controller.handle();

    assert!(handle.toggle());
    assert!(!h.controller.is_open());
    assert_eq!(h.controller.run_pending(), 1);
    assert!(h.controller.is_open());
}

#[tokio::test]
async fn test_handle_request_launch() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let handle = h.controller.handle();

    assert!(handle.request_launch(LaunchTarget::new(FOO_APP)));
    h.controller.process_next().await;
    h.controller.process_next().await;

    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_handle_status() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.toggle();
    let handle = h.controller.handle();

    let (status, _) = tokio::join!(handle.status(), h.controller.process_next());

    assert_eq!(
        status,
        Some(DockStatus {
            window_open: true,
            launch_in_flight: false,
        })
    );
}

#[tokio::test]
async fn test_handle_shutdown_stops_processing() {
    let mut h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    h.controller.start();
    let handle = h.controller.handle();

    assert!(handle.shutdown());
    assert!(!h.controller.process_next().await);
    assert!(!h.controller.is_started());
    assert!(!h.controller.process_next().await);
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let h = Harness::new(FakeBroker::granting(), FakeLauncher::succeeding());
    let windows = h.windows.clone();
    let handle = h.controller.handle();
    let task = tokio::spawn(h.controller.run());

    assert!(handle.toggle());
    let status = handle.status().await.unwrap();
    assert!(status.window_open);

    assert!(handle.shutdown());
    task.await.unwrap();

    // Run loop closes the dock on the way out
    assert_eq!(windows.lock().unwrap().last(), Some(&WindowEvent::Closed(1)));
    assert!(!handle.toggle());
    assert_eq!(handle.status().await, None);
}
