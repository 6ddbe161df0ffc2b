//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::commands;
use crate::domain::config::DEFAULT_PUBLIC_HOST;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::docker::DockerCli;

/// Host-resident deployment agent
#[derive(Parser)]
#[command(
    name = "hostpilot-agent",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Path to the agent config file
    #[arg(long, global = true, env = "HOSTPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register with the control plane and process tasks
    Run,

    /// Wait for credentials over HTTP, then run
    Bootstrap(commands::bootstrap::BootstrapArgs),

    /// Show the status of an application's container
    Status(commands::status::StatusArgs),

    /// List all containers on this host as JSON
    Scan,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, cancel: &CancellationToken) -> Result<()> {
        let Cli { config, command } = self;
        let store = YamlConfigStore::new(config);
        match command {
            Command::Run => commands::run::run(&store, cancel).await,
            Command::Bootstrap(args) => commands::bootstrap::run(&args, store, cancel).await,
            Command::Status(args) => {
                let runtime = DockerCli::new(TokioCommandRunner::default());
                commands::status::run(&runtime, &args).await;
                Ok(())
            }
            Command::Scan => {
                let public_host = store
                    .read()
                    .map_or_else(|_| DEFAULT_PUBLIC_HOST.to_string(), |c| c.public_host);
                let runtime = DockerCli::new(TokioCommandRunner::default());
                commands::scan::run(&runtime, &public_host).await
            }
        }
    }
}
