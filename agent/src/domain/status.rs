//! Reporting vocabulary for instance status.
//!
//! This table is the contract the control plane and reconciliation depend on;
//! the string forms must stay stable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of statuses reported upstream for a Managed Instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Created,
    Restarting,
    Paused,
    Failed,
    /// The runtime reported a state outside the mapping table.
    Unknown,
    /// The runtime has no instance under that name.
    NotFound,
    /// The runtime could not be queried.
    Error,
}

impl InstanceStatus {
    /// Map a runtime-native state string (`docker inspect .State.Status`).
    #[must_use]
    pub fn from_runtime_state(state: &str) -> Self {
        match state.trim() {
            "running" => Self::Running,
            "exited" => Self::Stopped,
            "created" => Self::Created,
            "restarting" => Self::Restarting,
            "paused" => Self::Paused,
            "dead" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Created => "created",
            Self::Restarting => "restarting",
            Self::Paused => "paused",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
