//! Core orchestration module
//!
//! Contains the engine registry, the orchestrator, side-by-side alignment
//! and the event plumbing between them

pub mod alignment;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod task;

// Re-export main types
pub use alignment::AlignmentEngine;
pub use error::{OrchestratorError, RegistryError};
pub use events::{DiffEvent, EventBus};
pub use orchestrator::{DiffOrchestrator, ExecutionMode, SelectionMode};
pub use registry::{EngineFactory, EngineInfo, EngineRegistry, RegistryEvent};
pub use task::{DiffHandle, TaskOutput};
