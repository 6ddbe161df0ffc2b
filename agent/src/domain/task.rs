//! Task routing: one variant per task type, decoded from the wire payload.

use std::collections::BTreeMap;

use anyhow::Result;
use hostpilot_common::string_or_number;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::error::TaskError;
use crate::domain::port::PortRequest;
use crate::domain::recipe::AppKind;

/// Declarative manifest deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub app_id: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(rename = "compose_file")]
    pub manifest: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Source-managed deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub app_id: String,
    pub git_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default, rename = "app_type")]
    pub app_kind: AppKind,
    #[serde(default)]
    pub port: PortRequest,
    #[serde(default, rename = "environment_vars")]
    pub env: BTreeMap<String, String>,
}

/// In-place redeploy of a source-managed application.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub app_id: String,
    #[serde(default)]
    pub git_url: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ContainerRef {
    container_name: String,
}

/// Every task type the agent understands, plus the catch-all.
#[derive(Debug, Clone)]
pub enum TaskCommand {
    DeployManifest(ManifestRequest),
    DeploySource(SourceRequest),
    UpdateSource(UpdateRequest),
    Start(String),
    Stop(String),
    Delete(String),
    Enumerate,
    Unknown(String),
}

impl TaskCommand {
    /// Decode a task from its wire type tag and payload.
    ///
    /// Unrecognized tags become [`TaskCommand::Unknown`]; the caller turns
    /// that into a failed result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidPayload`] when `data` does not match the
    /// shape the task type requires.
    pub fn parse(task_type: &str, data: &Value) -> Result<Self> {
        Ok(match task_type {
            "deploy_compose" | "deploy-manifest" => {
                Self::DeployManifest(payload("deploy_compose", data)?)
            }
            "deploy_git" | "deploy-source" => Self::DeploySource(payload("deploy_git", data)?),
            "update_application" | "update-source" => {
                Self::UpdateSource(payload("update_application", data)?)
            }
            "start_container" | "start" => {
                Self::Start(payload::<ContainerRef>("start_container", data)?.container_name)
            }
            "stop_container" | "stop" => {
                Self::Stop(payload::<ContainerRef>("stop_container", data)?.container_name)
            }
            "delete_container" | "delete" => {
                Self::Delete(payload::<ContainerRef>("delete_container", data)?.container_name)
            }
            "scan_containers" | "enumerate" => Self::Enumerate,
            other => Self::Unknown(other.to_string()),
        })
    }

    /// Short name used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::DeployManifest(_) => "deploy_compose",
            Self::DeploySource(_) => "deploy_git",
            Self::UpdateSource(_) => "update_application",
            Self::Start(_) => "start_container",
            Self::Stop(_) => "stop_container",
            Self::Delete(_) => "delete_container",
            Self::Enumerate => "scan_containers",
            Self::Unknown(tag) => tag,
        }
    }
}

fn payload<T: DeserializeOwned>(task_type: &'static str, data: &Value) -> Result<T> {
    let data = if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data.clone()
    };
    serde_json::from_value(data).map_err(|e| {
        TaskError::InvalidPayload {
            task_type,
            reason: e.to_string(),
        }
        .into()
    })
}
