pub mod cli;
pub mod config;
pub mod core;
pub mod diff;

pub use crate::config::{DiffSyncConfig, OrchestratorConfig};
pub use crate::core::*;
pub use crate::diff::*;
