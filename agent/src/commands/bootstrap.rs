//! `hostpilot-agent bootstrap`: wait for credentials, then run the agent.

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::app::AgentContext;
use crate::domain::config::DEFAULT_LISTEN_ADDR;
use crate::infra::bootstrap::wait_for_config;
use crate::infra::config::YamlConfigStore;

/// Arguments for the bootstrap command.
#[derive(Args)]
pub struct BootstrapArgs {
    /// Address for the configuration listener [default: `listen_addr` from
    /// the config file, else 0.0.0.0:8000]
    #[arg(long, env = "HOSTPILOT_LISTEN_ADDR")]
    pub listen: Option<String>,
}

impl BootstrapArgs {
    /// `--listen` first, then `listen_addr` of a readable config file, then
    /// [`DEFAULT_LISTEN_ADDR`].
    #[must_use]
    pub fn listen_addr(&self, store: &YamlConfigStore) -> String {
        if let Some(addr) = &self.listen {
            return addr.clone();
        }
        store
            .read()
            .map_or_else(|_| DEFAULT_LISTEN_ADDR.to_string(), |config| config.listen_addr)
    }
}

/// Serve the bootstrap listener until a valid config exists, then run the
/// agent in-process.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the agent fails to start.
pub async fn run(
    args: &BootstrapArgs,
    store: YamlConfigStore,
    cancel: &CancellationToken,
) -> Result<()> {
    let listen = args.listen_addr(&store);
    let Some(config) = wait_for_config(store, &listen, cancel).await? else {
        tracing::info!("cancelled before configuration arrived");
        return Ok(());
    };
    AgentContext::new(config)?.serve(cancel).await
}
