//! `hostpilot-agent status <app_id>`: print an application's reporting status.

use clap::Args;

use crate::application::ports::ContainerRuntime;
use crate::application::services::containers;

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Application identifier
    pub app_id: String,
}

/// Print the status of the instance backing `app_id`. Runtime failures are
/// printed as the `error` status.
pub async fn run(runtime: &impl ContainerRuntime, args: &StatusArgs) {
    let status = containers::app_status(runtime, &args.app_id).await;
    println!("{status}");
}
