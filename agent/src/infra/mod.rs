//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! docker and git CLIs, the control-plane HTTP client, config files, and the
//! bootstrap listener.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` are forbidden.

pub mod bootstrap;
pub mod command_runner;
pub mod config;
pub mod control_plane;
pub mod docker;
pub mod git;
pub mod network;
