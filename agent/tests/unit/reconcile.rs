//! Drift reconciliation: read-only, reports only real differences.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hostpilot_agent::application::services::reconcile::reconcile;
use hostpilot_agent::domain::{InstanceStatus, LabelSet};

use crate::mocks::{FakeControlPlane, FakeRuntime};

fn runtime() -> FakeRuntime {
    FakeRuntime::new()
        .with_container("hostpilot-web", "running", LabelSet::default())
        .with_container("hostpilot-api", "exited", LabelSet::default())
}

#[tokio::test]
async fn reports_only_differences_and_never_mutates() {
    let cp = FakeControlPlane::with_applications(vec![
        ("web", Some("running")),
        ("api", Some("running")),
        ("gone", Some("running")),
    ]);
    let runtime = runtime();

    let report = reconcile(&cp, &runtime, "agent-1").await.expect("reconcile");

    assert_eq!(report.checked, 3);
    let diverged: Vec<_> = report
        .divergences
        .iter()
        .map(|d| (d.app_id.as_str(), d.observed))
        .collect();
    assert_eq!(
        diverged,
        [("api", InstanceStatus::Stopped), ("gone", InstanceStatus::NotFound)]
    );

    let reports = cp.reports.borrow();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].app_id, "api");
    assert_eq!(reports[0].previous_status, "running");
    assert_eq!(reports[0].status, "stopped");
    assert_eq!(reports[1].status, "not_found");

    assert!(
        runtime.calls().iter().all(|c| c.starts_with("inspect ")),
        "reconciliation must only read: {:?}",
        runtime.calls()
    );
    assert_eq!(runtime.container("hostpilot-api").expect("kept").state, "exited");
}

#[tokio::test]
async fn missing_declared_status_counts_as_unknown() {
    let cp = FakeControlPlane::with_applications(vec![("web", None)]);
    let report = reconcile(&cp, &runtime(), "agent-1").await.expect("reconcile");
    assert_eq!(report.divergences.len(), 1);
    assert_eq!(report.divergences[0].declared, "unknown");
    assert_eq!(report.divergences[0].observed, InstanceStatus::Running);
}

#[tokio::test]
async fn runtime_errors_are_not_reported_as_drift() {
    let cp = FakeControlPlane::with_applications(vec![("web", Some("running"))]);
    let runtime = runtime();
    runtime.unavailable.set(true);
    let report = reconcile(&cp, &runtime, "agent-1").await.expect("reconcile");
    assert!(report.divergences.is_empty());
    assert!(cp.reports.borrow().is_empty());
}

#[tokio::test]
async fn failed_report_is_recorded_not_raised() {
    let mut cp = FakeControlPlane::with_applications(vec![("api", Some("running"))]);
    cp.fail_report = true;
    let report = reconcile(&cp, &runtime(), "agent-1").await.expect("reconcile");
    assert_eq!(report.divergences.len(), 1);
    assert!(!report.divergences[0].reported);
}
