//! Unit tests for the hostpilot agent
//!
//! These tests use in-memory fakes and run fast without docker, git or a
//! control plane.

mod architecture;
mod mocks;
mod reconcile;
mod router;
