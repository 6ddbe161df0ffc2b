//! `hostpilot-agent scan`: print every container on the host as JSON.

use anyhow::{Context, Result};

use crate::application::ports::ContainerRuntime;
use crate::application::services::containers;

/// Enumerate and classify all containers.
///
/// # Errors
///
/// Returns an error if the runtime cannot list containers.
pub async fn run(runtime: &impl ContainerRuntime, public_host: &str) -> Result<()> {
    let report = containers::scan(runtime, public_host).await?;
    let rendered = serde_json::to_string_pretty(&report).context("JSON serialization")?;
    println!("{rendered}");
    Ok(())
}
