//! Declarative manifest deployment.
//!
//! The working directory is created if absent but never cleared, so files
//! left by an earlier deployment persist.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Value, json};

use crate::application::ports::ManifestApplier;
use crate::application::services::workdir::{
    DeploySettings, MANIFEST_FILE, read_labels, write_labels,
};
use crate::domain::{DeployError, LabelSet};
use crate::domain::labels::DeploymentKind;
use crate::domain::naming::{project_name, resource_name};
use crate::domain::task::ManifestRequest;

/// Persist the manifest and its labels, then apply it detached.
///
/// # Errors
///
/// Returns [`DeployError::NameCollision`] when the working directory already
/// holds labels of a different application. Otherwise returns an error if the
/// working directory cannot be written or the apply exits non-zero (the error
/// carries the captured stderr).
pub async fn deploy(
    applier: &impl ManifestApplier,
    settings: &DeploySettings,
    request: &ManifestRequest,
) -> Result<Value> {
    tracing::info!(app_id = %request.app_id, app_name = %request.app_name, "deploying manifest");

    let dir = settings.app_dir(&request.app_id);
    if let Some(existing) = read_labels(&dir)?
        && let Some(owner) = existing.app_id()
        && owner != request.app_id
    {
        return Err(DeployError::NameCollision {
            resource_name: resource_name(&request.app_id),
            existing: owner.to_string(),
            requested: request.app_id.clone(),
        }
        .into());
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let manifest_path = dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, &request.manifest)
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    let labels = LabelSet::new(
        DeploymentKind::Manifest,
        &request.app_id,
        &settings.vps_id,
        Utc::now(),
    );
    write_labels(&dir, &labels)?;

    applier
        .apply(&project_name(&request.app_id), &manifest_path, &dir)
        .await?;

    tracing::info!(app_id = %request.app_id, "manifest applied");
    Ok(json!({
        "app_id": request.app_id,
        "app_name": request.app_name,
        "status": "deployed",
        "compose_file": manifest_path.display().to_string(),
    }))
}
