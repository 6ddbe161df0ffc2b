use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Task status value that marks a task as actionable.
pub const TASK_PENDING: &str = "pending";

/// A unit of work issued by the control plane to one agent.
///
/// Fields are optional on the wire; tasks missing an `id` are skipped by the
/// dispatcher rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub data: Value,
}

impl Task {
    /// `true` when the control plane marked this task as ready to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some(TASK_PENDING)
    }
}

/// Outcome of one task, submitted to `POST /command-result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResult {
    pub task_id: String,
    pub agent_id: String,
    pub task_type: String,
    pub success: bool,
    pub result: Value,
    pub error: String,
    /// Wall-clock duration in seconds.
    pub execution_time: f64,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub agent_id: String,
    pub agent_version: String,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub vps_id: String,
    pub status: String,
    pub capabilities: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// An application as declared by the control plane for this host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub app_id: Option<String>,
    pub status: Option<String>,
}

/// Divergence between declared and observed instance status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub agent_id: String,
    pub app_id: String,
    pub previous_status: String,
    pub status: String,
    pub observed_at: DateTime<Utc>,
}

/// Extract a list from a response that is either a bare JSON array or an
/// object wrapping the array under `key`. Any other shape yields `None`.
#[must_use]
pub fn unwrap_list(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Accept identifiers the control plane sends either as strings or numbers.
///
/// # Errors
///
/// Returns an error for values that are neither a string, a number nor null.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Non-optional variant of [`opt_string_or_number`]; null becomes `""`.
///
/// # Errors
///
/// Returns an error for values that are neither a string, a number nor null.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string_or_number(deserializer).map(Option::unwrap_or_default)
}
