//! Provenance labels attached to Managed Instances.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const LABEL_APP_ID: &str = "hostpilot.app_id";
pub const LABEL_TYPE: &str = "hostpilot.type";
pub const LABEL_CREATED_BY: &str = "hostpilot.created_by";
pub const LABEL_VPS_ID: &str = "hostpilot.vps_id";
pub const LABEL_DEPLOYMENT_TIME: &str = "hostpilot.deployment_time";
pub const LABEL_GIT_URL: &str = "hostpilot.git_url";
pub const LABEL_BRANCH: &str = "hostpilot.branch";
pub const LABEL_PORT: &str = "hostpilot.port";
pub const LABEL_LAST_UPDATED: &str = "hostpilot.last_updated";
pub const LABEL_UPDATE_COUNT: &str = "hostpilot.update_count";

/// Value of [`LABEL_CREATED_BY`] on everything this agent creates.
pub const CREATOR: &str = "hostpilot-agent";

/// Deployment flavor recorded under [`LABEL_TYPE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentKind {
    Manifest,
    Source,
}

impl DeploymentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manifest => "compose",
            Self::Source => "git",
        }
    }
}

/// Source provenance for git-backed deployments.
pub struct SourceOrigin<'a> {
    pub git_url: &'a str,
    pub branch: &'a str,
    pub port: u16,
}

/// Ordered key/value label mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Labels common to every deployment.
    #[must_use]
    pub fn new(kind: DeploymentKind, app_id: &str, vps_id: &str, now: DateTime<Utc>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_APP_ID.to_string(), app_id.to_string());
        labels.insert(LABEL_TYPE.to_string(), kind.as_str().to_string());
        labels.insert(LABEL_CREATED_BY.to_string(), CREATOR.to_string());
        labels.insert(LABEL_VPS_ID.to_string(), vps_id.to_string());
        labels.insert(LABEL_DEPLOYMENT_TIME.to_string(), timestamp(now));
        Self(labels)
    }

    /// Labels for a source deployment.
    #[must_use]
    pub fn for_source(
        app_id: &str,
        vps_id: &str,
        origin: &SourceOrigin<'_>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut labels = Self::new(DeploymentKind::Source, app_id, vps_id, now);
        labels.insert(LABEL_GIT_URL, origin.git_url);
        labels.insert(LABEL_BRANCH, origin.branch);
        labels.insert(LABEL_PORT, &origin.port.to_string());
        labels
    }

    /// Stamp an in-place update: refresh `last_updated`, bump `update_count`.
    /// A missing or unparsable counter counts as zero.
    pub fn record_update(&mut self, now: DateTime<Utc>) -> u64 {
        let count = self.update_count() + 1;
        self.insert(LABEL_LAST_UPDATED, &timestamp(now));
        self.insert(LABEL_UPDATE_COUNT, &count.to_string());
        count
    }

    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.get(LABEL_UPDATE_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        self.get(LABEL_APP_ID)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &LabelSet) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for LabelSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}
