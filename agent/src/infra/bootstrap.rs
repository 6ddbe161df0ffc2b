//! Bootstrap listener: accepts the agent's credentials over HTTP on a host
//! that was provisioned without them.
//!
//! `POST /config` validates and persists the credentials; `GET /status`
//! reports whether a usable config exists. Once one does, the listener shuts
//! down gracefully and the caller starts the agent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use hostpilot_common::string_or_number;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::domain::AgentConfig;
use crate::infra::config::YamlConfigStore;

/// How often the config file is re-checked while waiting.
pub const CONFIG_RECHECK: Duration = Duration::from_secs(10);

/// Shared state behind the bootstrap routes.
#[derive(Clone)]
pub struct BootstrapState {
    store: Arc<YamlConfigStore>,
    configured: Arc<Notify>,
}

impl BootstrapState {
    #[must_use]
    pub fn new(store: YamlConfigStore) -> Self {
        Self {
            store: Arc::new(store),
            configured: Arc::new(Notify::new()),
        }
    }
}

/// Credentials accepted by `POST /config`.
#[derive(Debug, Deserialize)]
struct ConfigPayload {
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    central_server: String,
    #[serde(default)]
    agent_token: String,
    #[serde(default, deserialize_with = "string_or_number")]
    vps_id: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({"status": "error", "message": message.into()});
    (status, Json(body)).into_response()
}

async fn post_config(State(state): State<BootstrapState>, Json(body): Json<Value>) -> Response {
    let payload: ConfigPayload = match serde_json::from_value(body) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid payload: {e}")),
    };
    let config = AgentConfig::with_credentials(
        &payload.agent_id,
        &payload.central_server,
        &payload.agent_token,
        &payload.vps_id,
    );
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "rejected bootstrap config");
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    if let Err(e) = state.store.save(&config) {
        tracing::error!(error = %format!("{e:#}"), "failed to persist bootstrap config");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"));
    }
    tracing::info!(agent_id = %config.agent_id, "bootstrap config received");
    state.configured.notify_one();
    (
        StatusCode::OK,
        Json(json!({"status": "success", "message": "configuration saved"})),
    )
        .into_response()
}

async fn get_status(State(state): State<BootstrapState>) -> Json<Value> {
    let loaded = state.store.load().is_ok();
    Json(json!({
        "status": if loaded { "configured" } else { "waiting_for_config" },
        "timestamp": Utc::now().to_rfc3339(),
        "config_loaded": loaded,
    }))
}

/// Routes served while waiting for configuration.
pub fn router(state: BootstrapState) -> Router {
    Router::new()
        .route("/config", post(post_config))
        .route("/status", get(get_status))
        .with_state(state)
}

/// Return a valid configuration, serving the bootstrap listener on
/// `listen_addr` until one arrives. Returns `Ok(None)` if cancelled first.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or fails while serving.
pub async fn wait_for_config(
    store: YamlConfigStore,
    listen_addr: &str,
    cancel: &CancellationToken,
) -> Result<Option<AgentConfig>> {
    if let Ok(config) = store.load() {
        return Ok(Some(config));
    }

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("cannot bind bootstrap listener on {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, config = %store.path().display(), "waiting for configuration");

    let state = BootstrapState::new(store);
    let configured = Arc::clone(&state.configured);
    let store = Arc::clone(&state.store);
    let server_token = cancel.child_token();
    let shutdown = server_token.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    let outcome = loop {
        if let Ok(config) = store.load() {
            break Some(config);
        }
        tokio::select! {
            () = cancel.cancelled() => break None,
            () = configured.notified() => {}
            () = tokio::time::sleep(CONFIG_RECHECK) => {}
        }
    };

    server_token.cancel();
    server
        .await
        .context("bootstrap listener task failed")?
        .context("bootstrap listener failed")?;
    tracing::info!("bootstrap listener stopped");
    Ok(outcome)
}
