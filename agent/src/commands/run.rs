//! `hostpilot-agent run`: register and dispatch until a shutdown signal.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::app::AgentContext;
use crate::infra::config::YamlConfigStore;

/// Run the agent against an existing config.
///
/// # Errors
///
/// Returns an error if the config is missing or invalid, or if registration
/// fails.
pub async fn run(store: &YamlConfigStore, cancel: &CancellationToken) -> Result<()> {
    let config = store.load()?;
    AgentContext::new(config)?.serve(cancel).await
}
