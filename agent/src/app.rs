//! Agent context: the production adapters wired together once at startup.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::ports::ControlPlane;
use crate::application::services::dispatch::{self, LoopSettings};
use crate::application::services::router::TaskRouter;
use crate::application::services::workdir::DeploySettings;
use crate::domain::AgentConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::control_plane::HttpControlPlane;
use crate::infra::docker::DockerCli;
use crate::infra::git::GitCli;
use crate::infra::network::TcpPortProbe;

/// Everything the `run` loop needs, built from a validated config.
pub struct AgentContext {
    pub config: AgentConfig,
    pub runtime: DockerCli<TokioCommandRunner>,
    pub git: GitCli<TokioCommandRunner>,
    pub probe: TcpPortProbe,
    pub control_plane: HttpControlPlane,
    pub settings: DeploySettings,
}

impl AgentContext {
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let control_plane = HttpControlPlane::new(&config)?;
        let settings = DeploySettings::new(
            config.apps_root.clone(),
            &config.vps_id,
            &config.public_host,
        );
        Ok(Self {
            runtime: DockerCli::new(TokioCommandRunner::default()),
            git: GitCli::new(TokioCommandRunner::default()),
            probe: TcpPortProbe,
            control_plane,
            settings,
            config,
        })
    }

    #[must_use]
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            agent_id: self.config.agent_id.clone(),
            poll_interval: self.config.poll_interval(),
            reconcile_interval: self.config.reconcile_interval(),
            error_backoff: self.config.error_backoff(),
        }
    }

    /// Register with the control plane, then dispatch tasks until `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    pub async fn serve(&self, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(
            agent_id = %self.config.agent_id,
            vps_id = %self.config.vps_id,
            server = %self.config.central_server,
            "starting agent"
        );
        self.control_plane
            .register()
            .await
            .context("registration with control plane failed")?;

        let executor = TaskRouter::new(&self.runtime, &self.git, &self.probe, &self.settings);
        dispatch::run(
            &self.control_plane,
            &executor,
            &self.runtime,
            &self.loop_settings(),
            cancel,
        )
        .await;
        Ok(())
    }
}
