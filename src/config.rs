//! Configuration management for diffsync
//!
//! This module provides configuration structures and defaults for the
//! orchestrator and for the per-engine settings seeded into the registry.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::EngineRegistry;
use crate::diff::{EngineConfig, PRECISE_ENGINE_ID, SCALABLE_ENGINE_ID};

/// Global configuration for diffsync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSyncConfig {
    /// Engine selection and execution settings
    pub orchestrator: OrchestratorConfig,
    /// Default configuration per engine id
    pub engines: BTreeMap<String, EngineConfig>,
}

/// Configuration for engine selection and execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Engine used when nothing else is chosen
    pub default_engine: String,
    /// Engine tried when the current one is unavailable
    pub default_fallback: String,
    /// Engine picked by auto selection for small inputs
    pub precise_engine: String,
    /// Engine picked by auto selection otherwise
    pub scalable_engine: String,
    /// Combined input length (chars) below which the precise engine is preferred
    pub small_input_threshold: usize,
    /// Worker threads of the runtime owned for asynchronous diffs
    pub worker_threads: usize,
    /// Log failures at warn level instead of debug
    pub error_output_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_engine: SCALABLE_ENGINE_ID.to_string(),
            default_fallback: PRECISE_ENGINE_ID.to_string(),
            precise_engine: PRECISE_ENGINE_ID.to_string(),
            scalable_engine: SCALABLE_ENGINE_ID.to_string(),
            small_input_threshold: 1000,
            worker_threads: 2,
            error_output_enabled: false,
        }
    }
}

/// Configuration loading and management
impl DiffSyncConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from file if given, otherwise use default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override values with environment variables if present
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("DIFFSYNC_DEFAULT_ENGINE") {
            if !val.is_empty() {
                self.orchestrator.default_engine = val;
            }
        }

        if let Ok(val) = std::env::var("DIFFSYNC_FALLBACK_ENGINE") {
            if !val.is_empty() {
                self.orchestrator.default_fallback = val;
            }
        }

        if let Ok(val) = std::env::var("DIFFSYNC_SMALL_INPUT_THRESHOLD") {
            if let Ok(threshold) = val.parse::<usize>() {
                self.orchestrator.small_input_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("DIFFSYNC_WORKER_THREADS") {
            if let Ok(threads) = val.parse::<usize>() {
                self.orchestrator.worker_threads = threads;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let orch = &self.orchestrator;
        for (field, id) in [
            ("default_engine", &orch.default_engine),
            ("default_fallback", &orch.default_fallback),
            ("precise_engine", &orch.precise_engine),
            ("scalable_engine", &orch.scalable_engine),
        ] {
            if id.trim().is_empty() {
                return Err(format!("{} must not be empty", field));
            }
        }

        if orch.small_input_threshold == 0 {
            return Err("small_input_threshold must be greater than 0".to_string());
        }

        if orch.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".to_string());
        }

        if self.engines.keys().any(|id| id.is_empty()) {
            return Err("engine ids in [engines] must not be empty".to_string());
        }

        Ok(())
    }

    /// Seed the registry with the per-engine defaults. Unknown ids are skipped.
    pub fn apply_engine_defaults(&self, registry: &EngineRegistry) {
        for (id, config) in &self.engines {
            if let Err(err) = registry.set_configuration(id, config.clone()) {
                tracing::warn!("Skipping configuration for engine '{}': {}", id, err);
            }
        }
    }
}
