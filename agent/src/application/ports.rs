//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types,
//! never from `crate::infra` or `crate::commands`.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use hostpilot_common::{Application, CommandResult, StatusReport, Task};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{LabelSet, TaskCommand};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Restart policy applied to every Managed Instance.
pub const RESTART_UNLESS_STOPPED: &str = "unless-stopped";

/// Parameters for creating and starting a detached container.
pub struct RunSpec<'a> {
    pub image: &'a str,
    pub name: &'a str,
    /// `(host_port, container_port)` pairs.
    pub ports: &'a [(u16, u16)],
    pub env: &'a BTreeMap<String, String>,
    pub restart_policy: &'a str,
    pub labels: &'a LabelSet,
}

/// A single container looked up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Runtime-native state, e.g. `"running"` or `"exited"`.
    pub state: String,
    pub labels: LabelSet,
}

/// A published port of a listed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    pub host_port: u16,
    pub container_port: u16,
}

/// One row of a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub created: String,
    pub ports: Vec<PortBinding>,
    pub labels: BTreeMap<String, String>,
}

// ── Process Port ──────────────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Container Runtime Ports ───────────────────────────────────────────────────

/// Container lifecycle operations keyed by container name.
///
/// Implementations report a missing container as
/// [`crate::domain::RuntimeError::NotFound`] and an unreachable runtime as
/// [`crate::domain::RuntimeError::Unavailable`].
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    async fn start(&self, name: &str) -> Result<()>;
    async fn stop(&self, name: &str) -> Result<()>;
    async fn restart(&self, name: &str) -> Result<()>;
    async fn remove(&self, name: &str, force: bool) -> Result<()>;
    /// Create and start a detached container; returns its id.
    async fn run(&self, spec: &RunSpec<'_>) -> Result<String>;
    /// Look a container up by name. `Ok(None)` means it does not exist.
    async fn inspect(&self, name: &str) -> Result<Option<ContainerDetails>>;
    /// List containers; `all` includes stopped ones.
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>>;
}

/// Image builds from a local build context.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Build `context` and tag the result as `tag`.
    async fn build(&self, context: &Path, tag: &str) -> Result<()>;
}

/// Declarative multi-container apply (compose).
#[allow(async_fn_in_trait)]
pub trait ManifestApplier {
    /// Bring the project described by `manifest` up, detached.
    async fn apply(&self, project: &str, manifest: &Path, project_dir: &Path) -> Result<()>;
}

// ── Source Control Port ───────────────────────────────────────────────────────

/// Checkout management for source-managed applications.
#[allow(async_fn_in_trait)]
pub trait SourceControl {
    async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;
    async fn fetch(&self, repo: &Path) -> Result<()>;
    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;
    /// Hard-reset the working tree to `origin/<branch>`.
    async fn reset_hard(&self, repo: &Path, branch: &str) -> Result<()>;
}

// ── Control Plane Port ────────────────────────────────────────────────────────

/// The remote control plane this agent reports to.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    async fn register(&self) -> Result<()>;
    /// Tasks addressed to this agent; unexpected response shapes yield `[]`.
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;
    async fn submit_result(&self, result: &CommandResult) -> Result<()>;
    /// Applications the control plane believes live on this host.
    async fn list_applications(&self) -> Result<Vec<Application>>;
    async fn report_status(&self, report: &StatusReport) -> Result<()>;
}

// ── Host Port ─────────────────────────────────────────────────────────────────

/// Checks whether a host TCP port can currently be bound.
#[cfg_attr(test, mockall::automock)]
pub trait PortProbe {
    fn is_bindable(&self, port: u16) -> bool;
}

// ── Task Execution Port ───────────────────────────────────────────────────────

/// Executes one decoded task and returns its result payload.
#[allow(async_fn_in_trait)]
pub trait TaskExecutor {
    async fn execute(&self, command: TaskCommand) -> Result<Value>;
}
