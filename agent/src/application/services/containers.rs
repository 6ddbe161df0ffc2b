//! Container lifecycle use-cases: status lookup, start/stop/delete task
//! handlers and the container scan.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};

use crate::application::ports::{ContainerRuntime, ContainerSummary};
use crate::domain::labels::{CREATOR, LABEL_APP_ID, LABEL_CREATED_BY};
use crate::domain::naming::{RESOURCE_PREFIX, resource_name};
use crate::domain::{InstanceStatus, RuntimeError};

/// Name prefixes of infrastructure containers that share the host.
const SYSTEM_PREFIXES: &[&str] = &["postgres-", "redis-", "nginx-"];

/// Reporting status of the container called `name`.
///
/// Never fails: an absent container is [`InstanceStatus::NotFound`], any
/// other runtime failure is [`InstanceStatus::Error`].
pub async fn status(runtime: &impl ContainerRuntime, name: &str) -> InstanceStatus {
    match runtime.inspect(name).await {
        Ok(Some(details)) => {
            let status = InstanceStatus::from_runtime_state(&details.state);
            tracing::debug!(name, native = %details.state, %status, "container status");
            status
        }
        Ok(None) => InstanceStatus::NotFound,
        Err(e) if matches!(e.downcast_ref::<RuntimeError>(), Some(RuntimeError::NotFound(_))) => {
            InstanceStatus::NotFound
        }
        Err(e) => {
            tracing::warn!(name, error = %e, "cannot determine container status");
            InstanceStatus::Error
        }
    }
}

/// Reporting status of the Managed Instance for `app_id`.
pub async fn app_status(runtime: &impl ContainerRuntime, app_id: &str) -> InstanceStatus {
    status(runtime, &resource_name(app_id)).await
}

/// # Errors
///
/// Returns the runtime error when the container cannot be started.
pub async fn start(runtime: &impl ContainerRuntime, name: &str) -> Result<Value> {
    runtime.start(name).await?;
    tracing::info!(name, "container started");
    Ok(json!({ "status": "started" }))
}

/// # Errors
///
/// Returns the runtime error when the container cannot be stopped.
pub async fn stop(runtime: &impl ContainerRuntime, name: &str) -> Result<Value> {
    runtime.stop(name).await?;
    tracing::info!(name, "container stopped");
    Ok(json!({ "status": "stopped" }))
}

/// Force-remove a container.
///
/// # Errors
///
/// Returns the runtime error when the container cannot be removed.
pub async fn delete(runtime: &impl ContainerRuntime, name: &str) -> Result<Value> {
    runtime.remove(name, true).await?;
    tracing::info!(name, "container deleted");
    Ok(json!({ "status": "deleted" }))
}

/// All containers (running or not) matching `predicate`.
///
/// # Errors
///
/// Returns an error if the runtime cannot list containers.
pub async fn enumerate(
    runtime: &impl ContainerRuntime,
    predicate: impl Fn(&ContainerSummary) -> bool,
) -> Result<Vec<ContainerSummary>> {
    let mut containers = runtime.list(true).await?;
    containers.retain(|c| predicate(c));
    Ok(containers)
}

/// Ownership class reported by the container scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerClass {
    Managed,
    System,
    Other,
}

/// Classify a container and recover its app id where possible.
#[must_use]
pub fn classify(container: &ContainerSummary) -> (ContainerClass, Option<String>) {
    let label = |k: &str| container.labels.get(k).cloned();
    if label(LABEL_CREATED_BY).as_deref() == Some(CREATOR) {
        return (ContainerClass::Managed, label(LABEL_APP_ID));
    }
    if container.name == CREATOR {
        return (ContainerClass::System, None);
    }
    if let Some(rest) = container.name.strip_prefix(RESOURCE_PREFIX) {
        return (ContainerClass::Managed, Some(rest.to_string()));
    }
    if SYSTEM_PREFIXES.iter().any(|p| container.name.starts_with(p)) {
        return (ContainerClass::System, None);
    }
    (ContainerClass::Other, None)
}

#[derive(Debug, Serialize)]
struct ScannedContainer {
    container_id: String,
    name: String,
    status: String,
    image: String,
    created: String,
    ports: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    container_type: ContainerClass,
    app_id: Option<String>,
    app_url: Option<String>,
}

/// Describe every container on the host, classified by ownership.
///
/// # Errors
///
/// Returns an error if the runtime cannot list containers.
pub async fn scan(runtime: &impl ContainerRuntime, public_host: &str) -> Result<Value> {
    let containers = enumerate(runtime, |_| true).await?;
    let scanned: Vec<ScannedContainer> = containers
        .into_iter()
        .map(|c| {
            let (container_type, app_id) = classify(&c);
            let ports: BTreeMap<String, String> = c
                .ports
                .iter()
                .map(|b| {
                    (
                        format!("{}->{}", b.host_port, b.container_port),
                        format!("http://{public_host}:{}", b.host_port),
                    )
                })
                .collect();
            let app_url = c
                .ports
                .first()
                .map(|b| format!("http://{public_host}:{}", b.host_port));
            ScannedContainer {
                container_id: c.id,
                name: c.name,
                status: c.state,
                image: c.image,
                created: c.created,
                ports,
                labels: c.labels,
                container_type,
                app_id,
                app_url,
            }
        })
        .collect();

    let count = |class: ContainerClass| scanned.iter().filter(|c| c.container_type == class).count();
    let (managed, system, other) = (
        count(ContainerClass::Managed),
        count(ContainerClass::System),
        count(ContainerClass::Other),
    );
    tracing::info!(total = scanned.len(), managed, system, other, "container scan complete");

    Ok(json!({
        "total_count": scanned.len(),
        "managed_count": managed,
        "system_count": system,
        "other_count": other,
        "containers": scanned,
    }))
}
