//! Agent configuration schema and validation.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use hostpilot_common::string_or_number;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Marker written by installers before real credentials arrive.
pub const PLACEHOLDER: &str = "PLACEHOLDER";

pub const DEFAULT_APPS_ROOT: &str = "/opt/hostpilot/apps";
pub const DEFAULT_CONFIG_PATH: &str = "/opt/hostpilot/config.yml";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_PUBLIC_HOST: &str = "localhost";

/// Agent configuration stored as YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent_id: String,
    /// Base URL of the control-plane API.
    #[serde(default)]
    pub central_server: String,
    #[serde(default)]
    pub agent_token: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub vps_id: String,

    /// Root under which each application gets its working directory.
    #[serde(default = "default_apps_root")]
    pub apps_root: PathBuf,
    /// Host name used to build external application URLs.
    #[serde(default = "default_public_host")]
    pub public_host: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    /// Bind address of the bootstrap listener.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_apps_root() -> PathBuf {
    PathBuf::from(DEFAULT_APPS_ROOT)
}

fn default_public_host() -> String {
    DEFAULT_PUBLIC_HOST.to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_reconcile_interval() -> u64 {
    180
}

fn default_error_backoff() -> u64 {
    60
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

/// Partial configuration read from `HOSTPILOT_*` environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverrides {
    pub agent_id: Option<String>,
    pub central_server: Option<String>,
    pub agent_token: Option<String>,
    pub vps_id: Option<String>,
    pub apps_root: Option<PathBuf>,
    pub public_host: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub reconcile_interval_secs: Option<u64>,
    pub error_backoff_secs: Option<u64>,
    pub listen_addr: Option<String>,
}

impl AgentConfig {
    /// Configuration holding only credentials; every tunable at its default.
    #[must_use]
    pub fn with_credentials(
        agent_id: &str,
        central_server: &str,
        agent_token: &str,
        vps_id: &str,
    ) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            central_server: central_server.to_string(),
            agent_token: agent_token.to_string(),
            vps_id: vps_id.to_string(),
            apps_root: default_apps_root(),
            public_host: default_public_host(),
            poll_interval_secs: default_poll_interval(),
            reconcile_interval_secs: default_reconcile_interval(),
            error_backoff_secs: default_error_backoff(),
            listen_addr: default_listen_addr(),
        }
    }

    /// Apply environment overrides on top of file values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            agent_id,
            central_server,
            agent_token,
            vps_id,
            apps_root,
            public_host,
            poll_interval_secs,
            reconcile_interval_secs,
            error_backoff_secs,
            listen_addr,
        } = overrides;
        if let Some(v) = agent_id {
            self.agent_id = v;
        }
        if let Some(v) = central_server {
            self.central_server = v;
        }
        if let Some(v) = agent_token {
            self.agent_token = v;
        }
        if let Some(v) = vps_id {
            self.vps_id = v;
        }
        if let Some(v) = apps_root {
            self.apps_root = v;
        }
        if let Some(v) = public_host {
            self.public_host = v;
        }
        if let Some(v) = poll_interval_secs {
            self.poll_interval_secs = v;
        }
        if let Some(v) = reconcile_interval_secs {
            self.reconcile_interval_secs = v;
        }
        if let Some(v) = error_backoff_secs {
            self.error_backoff_secs = v;
        }
        if let Some(v) = listen_addr {
            self.listen_addr = v;
        }
    }

    /// Require all four credentials to be present and real.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or placeholder field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("agent_id", &self.agent_id),
            ("central_server", &self.central_server),
            ("agent_token", &self.agent_token),
            ("vps_id", &self.vps_id),
        ];
        for (name, value) in fields {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::MissingField(name).into());
            }
            if value == PLACEHOLDER {
                return Err(ConfigError::Placeholder(name).into());
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}
