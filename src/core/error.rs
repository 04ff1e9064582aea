use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of catalog operations on the engine registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("engine id must not be empty")]
    EmptyId,
    #[error("engine '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("engine '{0}' is not registered")]
    NotFound(String),
    #[error("engine '{0}' was registered without a factory")]
    InvalidFactory(String),
    #[error("factory for engine '{0}' produced no instance")]
    FactoryFailed(String),
}

/// Failures surfaced by the orchestrator. Each kind has a fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum OrchestratorError {
    #[error("invalid or empty engine id")]
    InvalidEngineId,
    #[error("requested engine is not registered")]
    EngineNotFound,
    #[error("engine could not be created")]
    EngineCreationFailed,
    #[error("diff engine reported a failure")]
    DiffExecutionFailed,
    #[error("engine configuration could not be applied")]
    ConfigurationError,
}

impl OrchestratorError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EmptyId => Self::InvalidEngineId,
            RegistryError::NotFound(_) => Self::EngineNotFound,
            RegistryError::InvalidFactory(_) | RegistryError::FactoryFailed(_) => {
                Self::EngineCreationFailed
            }
            RegistryError::AlreadyRegistered(_) => Self::ConfigurationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_fixed() {
        assert_eq!(OrchestratorError::EngineNotFound.message(), "requested engine is not registered");
        assert_eq!(
            RegistryError::NotFound("x".into()).to_string(),
            "engine 'x' is not registered"
        );
    }

    #[test]
    fn test_registry_error_mapping() {
        assert_eq!(
            OrchestratorError::from(RegistryError::FactoryFailed("x".into())),
            OrchestratorError::EngineCreationFailed
        );
        assert_eq!(
            OrchestratorError::from(RegistryError::NotFound("x".into())),
            OrchestratorError::EngineNotFound
        );
    }
}
