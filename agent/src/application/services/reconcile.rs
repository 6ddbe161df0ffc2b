//! Drift reconciliation: compare declared application status with what the
//! container runtime reports, and report differences upstream.
//!
//! Read/compare/report only. Nothing here mutates runtime state.

use anyhow::{Context, Result};
use chrono::Utc;
use hostpilot_common::StatusReport;

use crate::application::ports::{ContainerRuntime, ControlPlane};
use crate::application::services::containers;
use crate::domain::InstanceStatus;

/// One application whose observed status differs from the declared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub app_id: String,
    pub declared: String,
    pub observed: InstanceStatus,
    /// Whether the control plane accepted the report.
    pub reported: bool,
}

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub divergences: Vec<Divergence>,
}

/// Run one sweep over every application the control plane knows about.
///
/// # Errors
///
/// Returns an error only if the application list cannot be fetched; failed
/// divergence reports are logged and recorded in the result.
pub async fn reconcile(
    control_plane: &impl ControlPlane,
    runtime: &impl ContainerRuntime,
    agent_id: &str,
) -> Result<ReconcileReport> {
    let applications = control_plane
        .list_applications()
        .await
        .context("fetching applications")?;

    let mut report = ReconcileReport::default();
    for app in applications {
        let Some(app_id) = app.app_id else {
            continue;
        };
        report.checked += 1;

        let declared = app.status.unwrap_or_else(|| InstanceStatus::Unknown.to_string());
        let observed = containers::app_status(runtime, &app_id).await;
        if observed == InstanceStatus::Error || observed.as_str() == declared {
            continue;
        }

        tracing::info!(%app_id, %declared, %observed, "status divergence");
        let status_report = StatusReport {
            agent_id: agent_id.to_string(),
            app_id: app_id.clone(),
            previous_status: declared.clone(),
            status: observed.to_string(),
            observed_at: Utc::now(),
        };
        let reported = match control_plane.report_status(&status_report).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%app_id, error = %e, "failed to report status divergence");
                false
            }
        };
        report.divergences.push(Divergence {
            app_id,
            declared,
            observed,
            reported,
        });
    }

    tracing::info!(
        checked = report.checked,
        diverged = report.divergences.len(),
        "reconciliation finished"
    );
    Ok(report)
}
