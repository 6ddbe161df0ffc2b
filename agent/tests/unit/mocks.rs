//! Shared fakes for unit tests.
//!
//! `FakeRuntime` is an in-memory container runtime that behaves like docker
//! where it matters (name conflicts, refusing to remove a running
//! container); the other fakes record what they were asked to do.

#![allow(clippy::expect_used, dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::Result;
use hostpilot_agent::application::ports::{
    ContainerDetails, ContainerRuntime, ContainerSummary, ControlPlane, ImageBuilder,
    ManifestApplier, PortBinding, PortProbe, RunSpec, SourceControl, TaskExecutor,
};
use hostpilot_agent::domain::{LabelSet, ProcessError, RuntimeError, TaskCommand};
use hostpilot_common::{Application, CommandResult, StatusReport, Task};
use serde_json::{Value, json};

// ── Container runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub image: String,
    pub state: String,
    pub labels: LabelSet,
    pub ports: Vec<PortBinding>,
    pub env: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct FakeRuntime {
    pub containers: RefCell<BTreeMap<String, FakeContainer>>,
    pub calls: RefCell<Vec<String>>,
    pub build_error: RefCell<Option<String>>,
    pub unavailable: Cell<bool>,
    next_id: Cell<u32>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a container as if it had been created outside the test.
    pub fn with_container(self, name: &str, state: &str, labels: LabelSet) -> Self {
        self.containers.borrow_mut().insert(
            name.to_string(),
            FakeContainer {
                id: format!("seed-{name}"),
                image: format!("{name}:latest"),
                state: state.to_string(),
                labels,
                ports: Vec::new(),
                env: BTreeMap::new(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.containers.borrow().get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.containers.borrow().len()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.borrow_mut().push(call);
        if self.unavailable.get() {
            return Err(RuntimeError::Unavailable("daemon down".into()).into());
        }
        Ok(())
    }

    fn set_state(&self, name: &str, state: &str) -> Result<()> {
        let mut containers = self.containers.borrow_mut();
        let Some(container) = containers.get_mut(name) else {
            return Err(RuntimeError::NotFound(name.to_string()).into());
        };
        container.state = state.to_string();
        Ok(())
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn start(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"))?;
        self.set_state(name, "running")
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"))?;
        self.set_state(name, "exited")
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.record(format!("restart {name}"))?;
        self.set_state(name, "running")
    }

    async fn remove(&self, name: &str, force: bool) -> Result<()> {
        self.record(format!("rm{} {name}", if force { " -f" } else { "" }))?;
        let mut containers = self.containers.borrow_mut();
        let state = containers.get(name).map(|c| c.state.clone());
        match state {
            None => Err(RuntimeError::NotFound(name.to_string()).into()),
            Some(state) if state == "running" && !force => Err(RuntimeError::CommandFailed {
                op: "rm",
                target: name.to_string(),
                stderr: "cannot remove a running container".into(),
            }
            .into()),
            Some(_) => {
                containers.remove(name);
                Ok(())
            }
        }
    }

    async fn run(&self, spec: &RunSpec<'_>) -> Result<String> {
        self.record(format!("run {}", spec.name))?;
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(spec.name) {
            return Err(RuntimeError::CommandFailed {
                op: "run",
                target: spec.name.to_string(),
                stderr: "Conflict. The container name is already in use".into(),
            }
            .into());
        }
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        let id = format!("id-{n}");
        containers.insert(
            spec.name.to_string(),
            FakeContainer {
                id: id.clone(),
                image: spec.image.to_string(),
                state: "running".into(),
                labels: spec.labels.clone(),
                ports: spec
                    .ports
                    .iter()
                    .map(|&(host_port, container_port)| PortBinding {
                        host_port,
                        container_port,
                    })
                    .collect(),
                env: spec.env.clone(),
            },
        );
        Ok(id)
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerDetails>> {
        self.record(format!("inspect {name}"))?;
        Ok(self.containers.borrow().get(name).map(|c| ContainerDetails {
            id: c.id.clone(),
            name: name.to_string(),
            image: c.image.clone(),
            state: c.state.clone(),
            labels: c.labels.clone(),
        }))
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        self.record(format!("list{}", if all { " -a" } else { "" }))?;
        Ok(self
            .containers
            .borrow()
            .iter()
            .filter(|(_, c)| all || c.state == "running")
            .map(|(name, c)| ContainerSummary {
                id: c.id.clone(),
                name: name.clone(),
                image: c.image.clone(),
                state: c.state.clone(),
                created: "2024-01-01 00:00:00 +0000 UTC".into(),
                ports: c.ports.clone(),
                labels: c.labels.clone().into_inner(),
            })
            .collect())
    }
}

impl ImageBuilder for FakeRuntime {
    async fn build(&self, context: &Path, tag: &str) -> Result<()> {
        self.record(format!("build {tag}"))?;
        assert!(context.is_dir(), "build context must exist");
        if let Some(stderr) = self.build_error.borrow().clone() {
            return Err(ProcessError {
                step: "docker build",
                stderr,
            }
            .into());
        }
        Ok(())
    }
}

impl ManifestApplier for FakeRuntime {
    async fn apply(&self, project: &str, manifest: &Path, _project_dir: &Path) -> Result<()> {
        self.record(format!("compose up {project}"))?;
        assert!(manifest.is_file(), "manifest must be written before apply");
        Ok(())
    }
}

// ── Source control ────────────────────────────────────────────────────────────

/// Git fake; `clone_branch` materializes `files` in the destination.
#[derive(Default)]
pub struct FakeGit {
    pub files: Vec<(&'static str, &'static str)>,
    pub clone_error: Option<&'static str>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeGit {
    pub fn with_files(files: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl SourceControl for FakeGit {
    async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        self.calls.borrow_mut().push(format!("clone {url} {branch}"));
        if let Some(stderr) = self.clone_error {
            return Err(ProcessError {
                step: "git clone",
                stderr: stderr.to_string(),
            }
            .into());
        }
        for (name, contents) in &self.files {
            std::fs::write(dest.join(name), contents).expect("write cloned file");
        }
        Ok(())
    }

    async fn fetch(&self, _repo: &Path) -> Result<()> {
        self.calls.borrow_mut().push("fetch".into());
        Ok(())
    }

    async fn checkout(&self, _repo: &Path, branch: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("checkout {branch}"));
        Ok(())
    }

    async fn reset_hard(&self, _repo: &Path, branch: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("reset origin/{branch}"));
        Ok(())
    }
}

// ── Host ports ────────────────────────────────────────────────────────────────

/// Every port is bindable except those listed.
#[derive(Default)]
pub struct FakePortProbe {
    pub blocked: HashSet<u16>,
}

impl PortProbe for FakePortProbe {
    fn is_bindable(&self, port: u16) -> bool {
        !self.blocked.contains(&port)
    }
}

// ── Control plane ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeControlPlane {
    /// One entry per `fetch_tasks` call; `None` simulates a failed fetch.
    /// Once drained, fetches return no tasks.
    pub task_batches: RefCell<VecDeque<Option<Vec<Task>>>>,
    pub applications: Vec<Application>,
    pub fail_submit: bool,
    pub fail_report: bool,
    pub fetch_count: Cell<usize>,
    pub list_count: Cell<usize>,
    pub submitted: RefCell<Vec<CommandResult>>,
    pub reports: RefCell<Vec<StatusReport>>,
}

impl FakeControlPlane {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            task_batches: RefCell::new(VecDeque::from([Some(tasks)])),
            ..Self::default()
        }
    }

    pub fn with_applications(applications: Vec<(&str, Option<&str>)>) -> Self {
        Self {
            applications: applications
                .into_iter()
                .map(|(id, status)| Application {
                    app_id: Some(id.to_string()),
                    status: status.map(str::to_string),
                })
                .collect(),
            ..Self::default()
        }
    }
}

impl ControlPlane for FakeControlPlane {
    async fn register(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.fetch_count.set(self.fetch_count.get() + 1);
        match self.task_batches.borrow_mut().pop_front() {
            Some(Some(tasks)) => Ok(tasks),
            Some(None) => anyhow::bail!("connection refused"),
            None => Ok(Vec::new()),
        }
    }

    async fn submit_result(&self, result: &CommandResult) -> Result<()> {
        self.submitted.borrow_mut().push(result.clone());
        if self.fail_submit {
            anyhow::bail!("submit rejected");
        }
        Ok(())
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        self.list_count.set(self.list_count.get() + 1);
        Ok(self.applications.clone())
    }

    async fn report_status(&self, report: &StatusReport) -> Result<()> {
        self.reports.borrow_mut().push(report.clone());
        if self.fail_report {
            anyhow::bail!("report rejected");
        }
        Ok(())
    }
}

// ── Task executor ─────────────────────────────────────────────────────────────

/// Records each executed command's label; `stop_container` always fails.
#[derive(Default)]
pub struct RecordingExecutor {
    pub executed: RefCell<Vec<String>>,
}

impl TaskExecutor for RecordingExecutor {
    async fn execute(&self, command: TaskCommand) -> Result<Value> {
        self.executed.borrow_mut().push(command.label().to_string());
        match command {
            TaskCommand::Stop(name) => Err(RuntimeError::NotFound(name).into()),
            TaskCommand::Unknown(tag) => {
                Err(hostpilot_agent::domain::TaskError::UnknownType(tag).into())
            }
            _ => Ok(json!({"status": "ok"})),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn task(id: &str, task_type: &str, status: &str, data: Value) -> Task {
    Task {
        id: Some(id.to_string()),
        task_type: Some(task_type.to_string()),
        status: Some(status.to_string()),
        data,
    }
}

pub fn apps_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let root = dir.path().join("apps");
    (dir, root)
}
