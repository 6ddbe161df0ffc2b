//! Routes decoded tasks to their use-case handlers.

use anyhow::Result;
use serde_json::Value;

use crate::application::ports::{
    ContainerRuntime, ImageBuilder, ManifestApplier, PortProbe, SourceControl, TaskExecutor,
};
use crate::application::services::deploy_source::SourceDeployer;
use crate::application::services::workdir::DeploySettings;
use crate::application::services::{containers, deploy_manifest};
use crate::domain::{TaskCommand, TaskError};

/// The production [`TaskExecutor`]: one handler per [`TaskCommand`] variant.
pub struct TaskRouter<'a, R, G, P> {
    runtime: &'a R,
    git: &'a G,
    probe: &'a P,
    settings: &'a DeploySettings,
}

impl<'a, R, G, P> TaskRouter<'a, R, G, P> {
    #[must_use]
    pub fn new(runtime: &'a R, git: &'a G, probe: &'a P, settings: &'a DeploySettings) -> Self {
        Self {
            runtime,
            git,
            probe,
            settings,
        }
    }
}

impl<R, G, P> TaskExecutor for TaskRouter<'_, R, G, P>
where
    R: ContainerRuntime + ImageBuilder + ManifestApplier,
    G: SourceControl,
    P: PortProbe,
{
    async fn execute(&self, command: TaskCommand) -> Result<Value> {
        let deployer = SourceDeployer::new(self.runtime, self.git, self.probe, self.settings);
        match command {
            TaskCommand::DeployManifest(req) => {
                deploy_manifest::deploy(self.runtime, self.settings, &req).await
            }
            TaskCommand::DeploySource(req) => deployer.deploy(&req).await,
            TaskCommand::UpdateSource(req) => deployer.update(&req).await,
            TaskCommand::Start(name) => containers::start(self.runtime, &name).await,
            TaskCommand::Stop(name) => containers::stop(self.runtime, &name).await,
            TaskCommand::Delete(name) => containers::delete(self.runtime, &name).await,
            TaskCommand::Enumerate => containers::scan(self.runtime, &self.settings.public_host).await,
            TaskCommand::Unknown(tag) => Err(TaskError::UnknownType(tag).into()),
        }
    }
}
