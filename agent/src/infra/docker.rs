//! Docker CLI adapter.
//!
//! Implements the container runtime, image build, and compose apply ports by
//! shelling out to `docker` through a [`CommandRunner`].

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::{
    CommandRunner, ContainerDetails, ContainerRuntime, ContainerSummary, ImageBuilder,
    ManifestApplier, PortBinding, RunSpec,
};
use crate::domain::{LabelSet, ProcessError, RuntimeError};

/// Upper bound for `docker build`.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(600);
/// Upper bound for `docker compose up`.
pub const COMPOSE_TIMEOUT: Duration = Duration::from_secs(600);

const DOCKER: &str = "docker";

/// Docker driven through its command-line client.
pub struct DockerCli<R> {
    runner: R,
}

impl<R: CommandRunner> DockerCli<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn docker(&self, args: &[&str]) -> Result<Output> {
        self.runner.run(DOCKER, args).await.map_err(unavailable)
    }

    async fn docker_with_timeout(&self, args: &[&str], timeout: Duration) -> Result<Output> {
        self.runner
            .run_with_timeout(DOCKER, args, timeout)
            .await
            .map_err(unavailable)
    }

    /// Run a lifecycle subcommand that takes a single container name.
    async fn lifecycle(&self, op: &'static str, extra: &[&str], name: &str) -> Result<()> {
        let mut args = vec![op];
        args.extend_from_slice(extra);
        args.push(name);
        let output = self.docker(&args).await?;
        check(&output, op, name)?;
        tracing::debug!(op, container = name, "docker lifecycle call succeeded");
        Ok(())
    }
}

/// A spawn failure means the docker client itself is missing or unusable.
fn unavailable(e: anyhow::Error) -> anyhow::Error {
    if e.downcast_ref::<std::io::Error>().is_some() {
        RuntimeError::Unavailable(format!("{e:#}")).into()
    } else {
        e
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn is_missing(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("No such object")
}

fn check(output: &Output, op: &'static str, target: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = stderr_of(output);
    if is_missing(&stderr) {
        return Err(RuntimeError::NotFound(target.to_string()).into());
    }
    if stderr.contains("Cannot connect to the Docker daemon") {
        return Err(RuntimeError::Unavailable(stderr).into());
    }
    Err(RuntimeError::CommandFailed {
        op,
        target: target.to_string(),
        stderr,
    }
    .into())
}

// ── Output parsing ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectDoc {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: InspectState,
    #[serde(default)]
    config: InspectConfig,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    status: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    image: String,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

impl From<InspectDoc> for ContainerDetails {
    fn from(doc: InspectDoc) -> Self {
        Self {
            id: doc.id,
            name: doc.name.trim_start_matches('/').to_string(),
            image: doc.config.image,
            state: doc.state.status,
            labels: LabelSet::from(doc.config.labels.unwrap_or_default()),
        }
    }
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

impl From<PsLine> for ContainerSummary {
    fn from(line: PsLine) -> Self {
        Self {
            id: line.id,
            name: line.names,
            image: line.image,
            state: line.state,
            created: line.created_at,
            ports: parse_ports(&line.ports),
            labels: parse_labels(&line.labels),
        }
    }
}

/// Parse docker's port column, e.g.
/// `0.0.0.0:8001->8001/tcp, :::8001->8001/tcp, 443/tcp`.
/// Unpublished ports are skipped and IPv4/IPv6 duplicates collapse.
fn parse_ports(column: &str) -> Vec<PortBinding> {
    let mut bindings = Vec::new();
    for entry in column.split(',').map(str::trim) {
        let Some((host, container)) = entry.split_once("->") else {
            continue;
        };
        let host_port = host.rsplit(':').next().and_then(|p| p.parse().ok());
        let container_port = container.split('/').next().and_then(|p| p.parse().ok());
        if let (Some(host_port), Some(container_port)) = (host_port, container_port) {
            let binding = PortBinding {
                host_port,
                container_port,
            };
            if !bindings.contains(&binding) {
                bindings.push(binding);
            }
        }
    }
    bindings
}

/// Parse docker's `k=v,k=v` label column.
fn parse_labels(column: &str) -> BTreeMap<String, String> {
    column
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

// ── Ports ─────────────────────────────────────────────────────────────────────

impl<R: CommandRunner> ContainerRuntime for DockerCli<R> {
    async fn start(&self, name: &str) -> Result<()> {
        self.lifecycle("start", &[], name).await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.lifecycle("stop", &[], name).await
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.lifecycle("restart", &[], name).await
    }

    async fn remove(&self, name: &str, force: bool) -> Result<()> {
        let extra: &[&str] = if force { &["-f"] } else { &[] };
        self.lifecycle("rm", extra, name).await
    }

    async fn run(&self, spec: &RunSpec<'_>) -> Result<String> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            spec.name.into(),
            "--restart".into(),
            spec.restart_policy.into(),
        ];
        for (host, container) in spec.ports {
            args.push("-p".into());
            args.push(format!("{host}:{container}"));
        }
        for (key, value) in spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in spec.labels.iter() {
            args.push("--label".into());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.into());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.docker(&arg_refs).await?;
        check(&output, "run", spec.name)?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(container = spec.name, %id, "container started");
        Ok(id)
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerDetails>> {
        let output = self
            .docker(&["inspect", "--type", "container", "--format", "{{json .}}", name])
            .await?;
        match check(&output, "inspect", name) {
            Ok(()) => {}
            Err(e) if matches!(e.downcast_ref::<RuntimeError>(), Some(RuntimeError::NotFound(_))) => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let doc: InspectDoc = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing docker inspect output for {name}"))?;
        Ok(Some(doc.into()))
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        if all {
            args.push("-a");
        }
        let output = self.docker(&args).await?;
        check(&output, "ps", "")?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<PsLine>(line)
                    .map(ContainerSummary::from)
                    .context("parsing docker ps output")
            })
            .collect()
    }
}

impl<R: CommandRunner> ImageBuilder for DockerCli<R> {
    async fn build(&self, context: &Path, tag: &str) -> Result<()> {
        let context = context.to_string_lossy();
        tracing::info!(%tag, context = %context, "building image");
        let output = self
            .docker_with_timeout(&["build", "-t", tag, &context], BUILD_TIMEOUT)
            .await?;
        if !output.status.success() {
            return Err(ProcessError {
                step: "docker build",
                stderr: stderr_of(&output),
            }
            .into());
        }
        Ok(())
    }
}

impl<R: CommandRunner> ManifestApplier for DockerCli<R> {
    async fn apply(&self, project: &str, manifest: &Path, project_dir: &Path) -> Result<()> {
        let manifest = manifest.to_string_lossy();
        let project_dir = project_dir.to_string_lossy();
        tracing::info!(%project, "applying compose manifest");
        let output = self
            .docker_with_timeout(
                &[
                    "compose",
                    "-p",
                    project,
                    "-f",
                    &manifest,
                    "--project-directory",
                    &project_dir,
                    "up",
                    "-d",
                ],
                COMPOSE_TIMEOUT,
            )
            .await?;
        if !output.status.success() {
            return Err(ProcessError {
                step: "docker compose up",
                stderr: stderr_of(&output),
            }
            .into());
        }
        Ok(())
    }
}
