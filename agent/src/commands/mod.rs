//! Command implementations

pub mod bootstrap;
pub mod run;
pub mod scan;
pub mod status;
