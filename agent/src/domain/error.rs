//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers that need to branch on a variant use
//! `anyhow::Error::downcast_ref`.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Fatal configuration problems; the agent refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),

    #[error("config field {0} still holds a placeholder value")]
    Placeholder(&'static str),

    #[error("cannot read config {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

// ── Container runtime errors ─────────────────────────────────────────────────

/// Failures of container lifecycle operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("container {0} not found")]
    NotFound(String),

    #[error("docker {op} {target} failed: {stderr}")]
    CommandFailed {
        op: &'static str,
        target: String,
        stderr: String,
    },
}

// ── External process errors ──────────────────────────────────────────────────

/// A pipeline step backed by an external process exited unsuccessfully.
/// `stderr` is the captured output, verbatim.
#[derive(Debug, Error)]
#[error("{step} failed: {stderr}")]
pub struct ProcessError {
    pub step: &'static str,
    pub stderr: String,
}

// ── Deployment errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("application {0} not found")]
    ApplicationNotFound(String),

    #[error("container {0} not found")]
    ContainerNotFound(String),

    #[error(
        "resource name {resource_name} already belongs to application {existing}; \
         refusing to replace it for {requested}"
    )]
    NameCollision {
        resource_name: String,
        existing: String,
        requested: String,
    },

    #[error(
        "resource name {0} is held by a container without an owner label; \
         refusing to replace it"
    )]
    UnownedResource(String),
}

// ── Task errors ──────────────────────────────────────────────────────────────

/// Problems with a task itself; reported upstream as failed results.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unknown task type: {0}")]
    UnknownType(String),

    #[error("invalid payload for {task_type}: {reason}")]
    InvalidPayload {
        task_type: &'static str,
        reason: String,
    },
}
