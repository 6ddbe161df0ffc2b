//! HTTP client for the control-plane API.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use hostpilot_common::{
    Application, CommandResult, RegisterRequest, StatusReport, SystemInfo, Task, unwrap_list,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;

use crate::application::ports::ControlPlane;
use crate::domain::AgentConfig;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capabilities advertised at registration.
pub const CAPABILITIES: [&str; 3] = ["docker", "compose", "deploy"];

/// Control plane reached over HTTPS with a bearer token.
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
    token: String,
    agent_id: String,
    vps_id: String,
}

impl HttpControlPlane {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: config.central_server.trim_end_matches('/').to_string(),
            token: config.agent_token.clone(),
            agent_id: config.agent_id.clone(),
            vps_id: config.vps_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Base URL extended by `segments`, each percent-encoded as one path
    /// segment.
    fn segments_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid control plane URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("control plane URL {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let response = req
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("{what}: request failed"))?;
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{what}: control plane returned {status}: {body}")
    }
}

impl ControlPlane for HttpControlPlane {
    async fn register(&self) -> Result<()> {
        let body = RegisterRequest {
            agent_id: self.agent_id.clone(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            system_info: SystemInfo {
                vps_id: self.vps_id.clone(),
                status: "online".to_string(),
                capabilities: CAPABILITIES.iter().map(ToString::to_string).collect(),
                timestamp: Utc::now(),
            },
        };
        self.send(self.client.post(self.url("register")).json(&body), "register")
            .await?;
        tracing::info!(agent_id = %self.agent_id, "registered with control plane");
        Ok(())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let req = self
            .client
            .get(self.url("commands"))
            .query(&[("agent_id", self.agent_id.as_str())]);
        let body: Value = self
            .send(req, "fetch tasks")
            .await?
            .json()
            .await
            .context("fetch tasks: invalid JSON")?;
        let Some(items) = unwrap_list(body, "tasks") else {
            tracing::warn!("unexpected task list shape, treating as empty");
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed task");
                    None
                }
            })
            .collect())
    }

    async fn submit_result(&self, result: &CommandResult) -> Result<()> {
        self.send(
            self.client.post(self.url("command-result")).json(result),
            "submit result",
        )
        .await?;
        Ok(())
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        let url = self.segments_url(&[self.vps_id.as_str(), "applications"])?;
        let body: Value = self
            .send(self.client.get(url), "list applications")
            .await?
            .json()
            .await
            .context("list applications: invalid JSON")?;
        let items = unwrap_list(body, "applications").unwrap_or_default();
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    async fn report_status(&self, report: &StatusReport) -> Result<()> {
        let url = self.segments_url(&[
            self.vps_id.as_str(),
            "applications",
            report.app_id.as_str(),
            "status",
        ])?;
        self.send(self.client.post(url).json(report), "report status")
            .await?;
        Ok(())
    }
}
