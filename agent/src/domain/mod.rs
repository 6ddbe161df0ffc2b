//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod labels;
pub mod naming;
pub mod port;
pub mod recipe;
pub mod status;
pub mod task;

pub use config::AgentConfig;
pub use error::{ConfigError, DeployError, ProcessError, RuntimeError, TaskError};
pub use labels::LabelSet;
pub use naming::{image_tag, project_name, resource_name, sanitize};
pub use status::InstanceStatus;
pub use task::TaskCommand;
