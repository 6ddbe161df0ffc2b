//! YAML config file on disk, with `HOSTPILOT_*` environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::{ConfigOverrides, DEFAULT_CONFIG_PATH};
use crate::domain::{AgentConfig, ConfigError};

/// Prefix for environment overrides, e.g. `HOSTPILOT_AGENT_TOKEN`.
pub const ENV_PREFIX: &str = "HOSTPILOT_";

/// Agent configuration stored as a YAML file.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Use `path` if given (from `--config` or `HOSTPILOT_CONFIG`), else the
    /// system default location.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and apply environment overrides, without validating.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] if the file is missing or invalid.
    pub fn read(&self) -> Result<AgentConfig> {
        let display = self.path.display().to_string();
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Unreadable {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let mut config: AgentConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Unreadable {
                path: display,
                reason: e.to_string(),
            })?;
        config.apply(env_overrides()?);
        Ok(config)
    }

    /// Read, override, and validate.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or a required
    /// credential is missing or a placeholder.
    pub fn load(&self) -> Result<AgentConfig> {
        let config = self.read()?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", self.path.display()))?;
        Ok(config)
    }

    /// Write `config` with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, config: &AgentConfig) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("cannot write {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", self.path.display()))?;
        }
        tracing::info!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

/// Overrides from `HOSTPILOT_*` variables; unrelated variables are ignored.
///
/// # Errors
///
/// Returns an error if a variable is set but cannot be parsed, e.g. a
/// non-numeric `HOSTPILOT_POLL_INTERVAL_SECS`.
pub fn env_overrides() -> Result<ConfigOverrides> {
    envy::prefixed(ENV_PREFIX)
        .from_env::<ConfigOverrides>()
        .context("invalid HOSTPILOT_* environment override")
}
