//! Per-application working directories and their label metadata file.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::LabelSet;
use crate::domain::naming::sanitize;
use crate::domain::port::AUTO_PORT_RANGE;

/// Label metadata persisted next to each deployment.
pub const LABELS_FILE: &str = ".hostpilot-labels.json";

/// Manifest file written by manifest deployments.
pub const MANIFEST_FILE: &str = "docker-compose.yml";

/// Host-level settings shared by both deployment flavors.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub apps_root: PathBuf,
    pub vps_id: String,
    pub public_host: String,
    pub port_range: RangeInclusive<u16>,
}

impl DeploySettings {
    #[must_use]
    pub fn new(apps_root: PathBuf, vps_id: &str, public_host: &str) -> Self {
        Self {
            apps_root,
            vps_id: vps_id.to_string(),
            public_host: public_host.to_string(),
            port_range: AUTO_PORT_RANGE,
        }
    }

    /// Working directory of `app_id`. Keyed by the sanitized id so a hostile
    /// id cannot escape `apps_root`.
    #[must_use]
    pub fn app_dir(&self, app_id: &str) -> PathBuf {
        self.apps_root.join(sanitize(app_id))
    }

    #[must_use]
    pub fn app_url(&self, port: u16) -> String {
        format!("http://{}:{port}", self.public_host)
    }
}

/// Delete `dir` if present, then create it empty.
///
/// # Errors
///
/// Returns an error if the directory cannot be removed or created.
pub fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}

/// # Errors
///
/// Returns an error if the labels cannot be serialized or written.
pub fn write_labels(dir: &Path, labels: &LabelSet) -> Result<()> {
    let path = dir.join(LABELS_FILE);
    let content = serde_json::to_string_pretty(labels).context("serializing labels")?;
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))
}

/// Labels persisted in `dir`, or `None` when no metadata file exists.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_labels(dir: &Path) -> Result<Option<LabelSet>> {
    let path = dir.join(LABELS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("parsing {}", path.display()))
}
