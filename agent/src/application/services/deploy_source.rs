//! Source-managed deployment: clone → build → supersede → run, and the
//! in-place update that refreshes code and image of a running app.
//!
//! No step is rolled back. A failed build leaves the checkout in place; a
//! failed run after supersede leaves the app without an instance. The one
//! guarantee kept throughout is that an app never ends up with two instances.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Value, json};

use crate::application::ports::{
    ContainerRuntime, ImageBuilder, PortProbe, RESTART_UNLESS_STOPPED, RunSpec, SourceControl,
};
use crate::application::services::build_context;
use crate::application::services::workdir::{
    DeploySettings, read_labels, recreate_dir, write_labels,
};
use crate::domain::labels::{LABEL_GIT_URL, SourceOrigin};
use crate::domain::naming::{image_tag, resource_name};
use crate::domain::port::{PortRequest, select_port};
use crate::domain::task::{SourceRequest, UpdateRequest};
use crate::domain::{DeployError, LabelSet};

/// Orchestrates source deployments against explicit adapters.
pub struct SourceDeployer<'a, R, G, P> {
    runtime: &'a R,
    git: &'a G,
    probe: &'a P,
    settings: &'a DeploySettings,
}

impl<'a, R, G, P> SourceDeployer<'a, R, G, P>
where
    R: ContainerRuntime + ImageBuilder,
    G: SourceControl,
    P: PortProbe,
{
    #[must_use]
    pub fn new(runtime: &'a R, git: &'a G, probe: &'a P, settings: &'a DeploySettings) -> Self {
        Self {
            runtime,
            git,
            probe,
            settings,
        }
    }

    /// Deploy `request` from scratch, replacing any prior instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource name belongs to another app, or if
    /// clone, recipe synthesis, build or run fails.
    pub async fn deploy(&self, request: &SourceRequest) -> Result<Value> {
        let app_id = request.app_id.as_str();
        let name = resource_name(app_id);
        tracing::info!(app_id, git_url = %request.git_url, branch = %request.branch, "deploying from source");

        self.guard_collision(&name, app_id).await?;

        let port = self.resolve_port(request.port).await;
        let dir = self.settings.app_dir(app_id);
        recreate_dir(&dir)?;

        self.git
            .clone_branch(&request.git_url, &request.branch, &dir)
            .await?;

        let detected = if build_context::has_recipe(&dir) {
            "dockerfile"
        } else {
            build_context::synthesize(&dir, request.app_kind, port)?
                .recipe
                .name()
        };

        let image = image_tag(app_id);
        self.runtime.build(&dir, &image).await?;

        self.supersede(&name).await;

        let mut env = default_env(port);
        env.extend(request.env.clone());
        let labels = LabelSet::for_source(
            app_id,
            &self.settings.vps_id,
            &SourceOrigin {
                git_url: &request.git_url,
                branch: &request.branch,
                port,
            },
            Utc::now(),
        );
        write_labels(&dir, &labels)?;

        let container_id = self
            .runtime
            .run(&RunSpec {
                image: &image,
                name: &name,
                ports: &[(port, port)],
                env: &env,
                restart_policy: RESTART_UNLESS_STOPPED,
                labels: &labels,
            })
            .await
            .with_context(|| format!("starting {name}"))?;

        let app_url = self.settings.app_url(port);
        tracing::info!(app_id, %container_id, port, %app_url, "instance running");
        Ok(json!({
            "app_type": "git",
            "container_id": container_id,
            "container_name": name,
            "external_port": port,
            "app_url": app_url,
            "git_url": request.git_url,
            "branch": request.branch,
            "app_type_detected": detected,
            "status": "running",
        }))
    }

    /// Refresh checkout and image of an existing deployment, then restart
    /// its instance in place. Environment and port are not reapplied.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::ApplicationNotFound`] when the app was never
    /// deployed here, [`DeployError::ContainerNotFound`] when its instance is
    /// gone, or the failing step's error.
    pub async fn update(&self, request: &UpdateRequest) -> Result<Value> {
        let app_id = request.app_id.as_str();
        let dir = self.settings.app_dir(app_id);
        if !dir.is_dir() {
            return Err(DeployError::ApplicationNotFound(app_id.to_string()).into());
        }
        let name = resource_name(app_id);
        tracing::info!(app_id, branch = %request.branch, "updating application");

        self.guard_collision(&name, app_id).await?;

        self.git.fetch(&dir).await?;
        self.git.checkout(&dir, &request.branch).await?;
        self.git.reset_hard(&dir, &request.branch).await?;

        self.runtime.build(&dir, &image_tag(app_id)).await?;

        // Checkout and image are already refreshed when this fails.
        let Some(existing) = self
            .runtime
            .inspect(&name)
            .await
            .with_context(|| format!("looking up {name}"))?
        else {
            return Err(DeployError::ContainerNotFound(name).into());
        };

        let mut labels = existing.labels.clone();
        if let Some(persisted) = read_labels(&dir)? {
            labels.merge(&persisted);
        }
        let update_count = labels.record_update(Utc::now());
        write_labels(&dir, &labels)?;

        self.runtime.restart(&name).await?;

        let git_url = request
            .git_url
            .clone()
            .or_else(|| labels.get(LABEL_GIT_URL).map(str::to_string));
        tracing::info!(app_id, container_id = %existing.id, update_count, "application updated");
        Ok(json!({
            "app_id": app_id,
            "container_id": existing.id,
            "status": "updated",
            "git_url": git_url,
            "branch": request.branch,
            "update_count": update_count,
        }))
    }

    async fn resolve_port(&self, request: PortRequest) -> u16 {
        match request {
            PortRequest::Fixed(port) => port,
            PortRequest::Auto => {
                let used = self.published_ports().await;
                let port = select_port(self.settings.port_range.clone(), &used, |p| {
                    self.probe.is_bindable(p)
                });
                tracing::info!(port, "port auto-assigned");
                port
            }
        }
    }

    async fn published_ports(&self) -> HashSet<u16> {
        match self.runtime.list(false).await {
            Ok(containers) => containers
                .iter()
                .flat_map(|c| c.ports.iter().map(|b| b.host_port))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot list containers, relying on bind checks only");
                HashSet::new()
            }
        }
    }

    /// Refuse to touch an instance that another app id sanitized onto, or one
    /// carrying no owner label at all.
    async fn guard_collision(&self, name: &str, app_id: &str) -> Result<()> {
        let Ok(Some(existing)) = self.runtime.inspect(name).await else {
            return Ok(());
        };
        match existing.labels.app_id() {
            Some(owner) if owner == app_id => Ok(()),
            Some(owner) => Err(DeployError::NameCollision {
                resource_name: name.to_string(),
                existing: owner.to_string(),
                requested: app_id.to_string(),
            }
            .into()),
            None => Err(DeployError::UnownedResource(name.to_string()).into()),
        }
    }

    /// Stop and remove the prior instance. Every failure, including absence,
    /// is swallowed.
    async fn supersede(&self, name: &str) {
        match self.runtime.inspect(name).await {
            Ok(Some(_)) => {
                tracing::info!(name, "superseding previous instance");
                if let Err(e) = self.runtime.stop(name).await {
                    tracing::debug!(name, error = %e, "stop of previous instance failed");
                }
                if let Err(e) = self.runtime.remove(name, false).await {
                    tracing::warn!(name, error = %e, "removal of previous instance failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(name, error = %e, "previous instance lookup failed"),
        }
    }
}

fn default_env(port: u16) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("NODE_ENV".to_string(), "production".to_string()),
        ("PORT".to_string(), port.to_string()),
    ])
}
