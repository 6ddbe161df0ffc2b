//! Task dispatch loop.
//!
//! A single cooperative loop: poll, execute pending tasks one after another,
//! submit each result, and run reconciliation on its own cadence. Nothing in
//! here terminates the loop except the cancellation token.

use std::time::Duration;

use anyhow::{Context, Result};
use hostpilot_common::{CommandResult, Task};
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ContainerRuntime, ControlPlane, TaskExecutor};
use crate::application::services::reconcile;
use crate::domain::TaskCommand;

/// Timing and identity for the dispatch loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub agent_id: String,
    pub poll_interval: Duration,
    pub reconcile_interval: Duration,
    pub error_backoff: Duration,
}

/// Normalized outcome of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub success: bool,
    pub result: Value,
    pub error: String,
    pub execution_time: Duration,
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationStats {
    pub executed: usize,
    pub skipped: usize,
}

/// Decode and execute one task, timing it. Never fails: every error,
/// including an unknown task type, becomes a failed outcome.
pub async fn execute_task(executor: &impl TaskExecutor, task_type: &str, data: &Value) -> TaskOutcome {
    let started = Instant::now();
    let result = match TaskCommand::parse(task_type, data) {
        Ok(command) => {
            tracing::info!(task_type = command.label(), "executing task");
            executor.execute(command).await
        }
        Err(e) => Err(e),
    };
    let execution_time = started.elapsed();
    match result {
        Ok(result) => TaskOutcome {
            success: true,
            result,
            error: String::new(),
            execution_time,
        },
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(task_type, %error, "task failed");
            TaskOutcome {
                success: false,
                result: json!({}),
                error,
                execution_time,
            }
        }
    }
}

/// Fetch tasks once and run every pending one.
///
/// # Errors
///
/// Returns an error if tasks cannot be fetched. Result submission failures
/// are logged and do not fail the iteration.
pub async fn run_iteration(
    control_plane: &impl ControlPlane,
    executor: &impl TaskExecutor,
    agent_id: &str,
    cancel: &CancellationToken,
) -> Result<IterationStats> {
    let tasks = control_plane.fetch_tasks().await.context("fetching tasks")?;
    let mut stats = IterationStats::default();

    for task in tasks {
        if cancel.is_cancelled() {
            break;
        }
        let Task {
            id,
            task_type,
            status,
            data,
        } = task;
        let Some(task_id) = id else {
            tracing::warn!("skipping task without id");
            stats.skipped += 1;
            continue;
        };
        if status.as_deref() != Some(hostpilot_common::TASK_PENDING) {
            tracing::info!(%task_id, status = status.as_deref().unwrap_or("none"), "skipping non-pending task");
            stats.skipped += 1;
            continue;
        }

        let task_type = task_type.unwrap_or_else(|| "unknown".to_string());
        let outcome = execute_task(executor, &task_type, &data).await;
        stats.executed += 1;

        let result = CommandResult {
            task_id: task_id.clone(),
            agent_id: agent_id.to_string(),
            task_type,
            success: outcome.success,
            result: outcome.result,
            error: outcome.error,
            execution_time: outcome.execution_time.as_secs_f64(),
        };
        match control_plane.submit_result(&result).await {
            Ok(()) => tracing::info!(%task_id, success = result.success, "task result submitted"),
            Err(e) => tracing::error!(%task_id, error = %format!("{e:#}"), "failed to submit task result"),
        }
    }
    Ok(stats)
}

/// Run the dispatch loop until `cancel` fires.
///
/// The token is checked before each task and during every sleep; an
/// in-flight external call is allowed to finish or hit its own timeout.
pub async fn run(
    control_plane: &impl ControlPlane,
    executor: &impl TaskExecutor,
    runtime: &impl ContainerRuntime,
    settings: &LoopSettings,
    cancel: &CancellationToken,
) {
    tracing::info!(
        poll_secs = settings.poll_interval.as_secs(),
        reconcile_secs = settings.reconcile_interval.as_secs(),
        "dispatch loop started"
    );
    let mut last_reconcile = Instant::now();

    while !cancel.is_cancelled() {
        let delay = match run_iteration(control_plane, executor, &settings.agent_id, cancel).await {
            Ok(stats) => {
                if stats.executed + stats.skipped > 0 {
                    tracing::debug!(executed = stats.executed, skipped = stats.skipped, "poll cycle done");
                }
                settings.poll_interval
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "dispatch iteration failed, backing off");
                settings.error_backoff
            }
        };

        if !cancel.is_cancelled() && last_reconcile.elapsed() >= settings.reconcile_interval {
            if let Err(e) = reconcile::reconcile(control_plane, runtime, &settings.agent_id).await {
                tracing::warn!(error = %format!("{e:#}"), "reconciliation failed");
            }
            last_reconcile = Instant::now();
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }
    tracing::info!("dispatch loop stopped");
}
