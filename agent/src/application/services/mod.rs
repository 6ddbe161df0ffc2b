//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra` or
//! `crate::commands`.

pub mod build_context;
pub mod containers;
pub mod deploy_manifest;
pub mod deploy_source;
pub mod dispatch;
pub mod reconcile;
pub mod router;
pub mod workdir;
