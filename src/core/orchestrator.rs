//! Single entry point for computing diffs
//!
//! The orchestrator resolves which engine to run (manually or by the
//! automatic policy), creates a fresh instance through the registry, runs it
//! on the calling thread or on a worker, and reports the outcome through
//! [`DiffEvent`]s and its `last_error` status. No failure escapes as a panic
//! or `Err`; every path ends in a [`DiffResult`] with `ok == false`.
//!
//! Mutable status (`busy`, `last_error`) belongs to one orchestrator and
//! describes its most recently started computation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::alignment::AlignmentEngine;
use super::error::OrchestratorError;
use super::events::{DiffEvent, EventBus};
use super::registry::EngineRegistry;
use super::task::{DiffHandle, Executor};
use crate::config::OrchestratorConfig;
use crate::diff::{DiffMode, DiffResult, EngineConfig, SideBySideResult};

/// How the engine for a computation is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Auto,
    Manual,
}

/// Whether callers block on the engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sync,
    Async,
}

#[derive(Debug, Default)]
struct RunStatus {
    last_error: Option<OrchestratorError>,
    in_flight: usize,
}

type SharedStatus = Arc<Mutex<RunStatus>>;

fn lock_status(status: &SharedStatus) -> MutexGuard<'_, RunStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks one computation as in flight until dropped
struct InFlight(SharedStatus);

impl InFlight {
    fn start(status: &SharedStatus) -> Self {
        let mut guard = lock_status(status);
        guard.in_flight += 1;
        guard.last_error = None;
        drop(guard);
        Self(Arc::clone(status))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = lock_status(&self.0);
        guard.in_flight = guard.in_flight.saturating_sub(1);
    }
}

/// Everything a computation needs, detached from the orchestrator so it can
/// move onto a worker thread
#[derive(Clone)]
struct Runner {
    registry: Arc<EngineRegistry>,
    status: SharedStatus,
    events: EventBus,
    config: OrchestratorConfig,
    current_engine: String,
    fallback_engine: String,
    diff_mode: DiffMode,
    error_output_enabled: bool,
}

impl Runner {
    fn auto_select(&self, left: &str, right: &str) -> Option<String> {
        let registry = &self.registry;
        let total = left.chars().count() + right.chars().count();

        if total < self.config.small_input_threshold && registry.is_available(&self.config.precise_engine) {
            return Some(self.config.precise_engine.clone());
        }
        if registry.is_available(&self.config.scalable_engine) {
            return Some(self.config.scalable_engine.clone());
        }

        [&self.current_engine, &self.fallback_engine, &self.config.default_engine]
            .into_iter()
            .find(|id| !id.is_empty() && registry.is_available(id))
            .cloned()
    }

    fn resolve(
        &self,
        left: &str,
        right: &str,
        selection: SelectionMode,
        engine_id: &str,
    ) -> Result<String, (OrchestratorError, String)> {
        match selection {
            SelectionMode::Manual => {
                if engine_id.is_empty() {
                    Err((OrchestratorError::InvalidEngineId, "no engine id given for manual selection".to_string()))
                } else if !self.registry.is_available(engine_id) {
                    Err((OrchestratorError::EngineNotFound, engine_id.to_string()))
                } else {
                    Ok(engine_id.to_string())
                }
            }
            SelectionMode::Auto => self.auto_select(left, right).ok_or_else(|| {
                (OrchestratorError::EngineCreationFailed, "no registered engine could be selected".to_string())
            }),
        }
    }

    fn run_engine(&self, id: &str, left: &str, right: &str) -> Result<DiffResult, (OrchestratorError, String)> {
        let engine = self
            .registry
            .create(id)
            .map_err(|err| (OrchestratorError::EngineCreationFailed, err.to_string()))?;

        let mode = self.diff_mode;
        let outcome = catch_unwind(AssertUnwindSafe(|| engine.compute(left, right, mode)));

        match outcome {
            Ok(result) if result.ok => Ok(result),
            Ok(result) => Err((OrchestratorError::DiffExecutionFailed, result.error_text().to_string())),
            Err(payload) => Err((OrchestratorError::DiffExecutionFailed, panic_message(payload.as_ref()))),
        }
    }

    /// Resolve, run and report one computation
    fn execute(&self, left: &str, right: &str, selection: SelectionMode, engine_id: &str) -> (DiffResult, String) {
        let started = Instant::now();

        let resolved = self.resolve(left, right, selection, engine_id);
        let engine_used = resolved.as_ref().map(String::clone).unwrap_or_default();
        self.events.publish(DiffEvent::Started {
            engine_id: engine_used.clone(),
        });

        let outcome = resolved.and_then(|id| self.run_engine(&id, left, right));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => {
                tracing::debug!(
                    engine = %engine_used,
                    changes = result.changes.len(),
                    elapsed_ms,
                    "diff computed"
                );
                result
                    .with_metadata("engine_id", engine_used.as_str())
                    .with_metadata("elapsed_ms", elapsed_ms)
            }
            Err((kind, detail)) => {
                self.record_error(kind, &detail);
                let text = if kind == OrchestratorError::DiffExecutionFailed {
                    detail
                } else {
                    format!("{}: {}", kind, detail)
                };
                DiffResult::failure(text)
                    .with_metadata("engine_id", engine_used.as_str())
                    .with_metadata("elapsed_ms", elapsed_ms)
            }
        };

        self.events.publish(DiffEvent::Finished(result.clone()));
        if result.ok {
            self.events.publish(DiffEvent::DiffCalculated(result.clone()));
        }

        (result, engine_used)
    }

    fn execute_side_by_side(
        &self,
        left: &str,
        right: &str,
        selection: SelectionMode,
        engine_id: &str,
    ) -> SideBySideResult {
        let (result, engine_used) = self.execute(left, right, selection, engine_id);
        let aligned = AlignmentEngine::align(&result, &engine_used);
        if aligned.ok() {
            self.events.publish(DiffEvent::SideBySideDiffCalculated(aligned.clone()));
        }
        aligned
    }

    fn record_error(&self, kind: OrchestratorError, detail: &str) {
        lock_status(&self.status).last_error = Some(kind);
        report(self.error_output_enabled, kind, detail);
        self.events.publish(DiffEvent::ErrorOccurred {
            kind,
            message: kind.message(),
        });
    }
}

fn report(error_output_enabled: bool, kind: OrchestratorError, detail: &str) {
    if error_output_enabled {
        tracing::warn!("Diff orchestration error: {} ({})", kind, detail);
    } else {
        tracing::debug!("Diff orchestration error: {} ({})", kind, detail);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "diff engine panicked".to_string()
    }
}

/// Selects, runs and reports diff engines
pub struct DiffOrchestrator {
    registry: Arc<EngineRegistry>,
    config: OrchestratorConfig,
    current_engine: String,
    fallback_engine: String,
    selection_mode: SelectionMode,
    execution_mode: ExecutionMode,
    diff_mode: DiffMode,
    error_output_enabled: bool,
    status: SharedStatus,
    events: EventBus,
    executor: Executor,
}

impl DiffOrchestrator {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self::with_config(registry, OrchestratorConfig::default())
    }

    pub fn with_config(registry: Arc<EngineRegistry>, config: OrchestratorConfig) -> Self {
        let executor = Executor::detect(config.worker_threads);
        Self::build(registry, config, executor)
    }

    /// Run asynchronous work on the given runtime
    pub fn with_runtime(registry: Arc<EngineRegistry>, config: OrchestratorConfig, handle: tokio::runtime::Handle) -> Self {
        Self::build(registry, config, Executor::Ambient(handle))
    }

    fn build(registry: Arc<EngineRegistry>, config: OrchestratorConfig, executor: Executor) -> Self {
        Self {
            registry,
            current_engine: config.default_engine.clone(),
            fallback_engine: config.default_fallback.clone(),
            selection_mode: SelectionMode::Auto,
            execution_mode: ExecutionMode::Sync,
            diff_mode: DiffMode::Auto,
            error_output_enabled: config.error_output_enabled,
            config,
            status: SharedStatus::default(),
            events: EventBus::new(),
            executor,
        }
    }

    fn runner(&self) -> Runner {
        Runner {
            registry: Arc::clone(&self.registry),
            status: Arc::clone(&self.status),
            events: self.events.clone(),
            config: self.config.clone(),
            current_engine: self.current_engine.clone(),
            fallback_engine: self.fallback_engine.clone(),
            diff_mode: self.diff_mode,
            error_output_enabled: self.error_output_enabled,
        }
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<DiffEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn is_engine_available(&self, id: &str) -> bool {
        self.registry.is_available(id)
    }

    pub fn available_engines(&self) -> Vec<String> {
        self.registry.list_ids()
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.selection_mode != mode {
            self.selection_mode = mode;
            self.events.publish(DiffEvent::SelectionModeChanged(mode));
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        if self.execution_mode != mode {
            self.execution_mode = mode;
            self.events.publish(DiffEvent::ExecutionModeChanged(mode));
        }
    }

    pub fn diff_mode(&self) -> DiffMode {
        self.diff_mode
    }

    /// Granularity hint passed to engines
    pub fn set_diff_mode(&mut self, mode: DiffMode) {
        self.diff_mode = mode;
    }

    pub fn error_output_enabled(&self) -> bool {
        self.error_output_enabled
    }

    pub fn set_error_output_enabled(&mut self, enabled: bool) {
        self.error_output_enabled = enabled;
    }

    pub fn current_engine(&self) -> &str {
        &self.current_engine
    }

    pub fn set_current_engine(&mut self, id: &str) -> Result<(), OrchestratorError> {
        self.validate_engine_id(id)?;
        if self.current_engine != id {
            self.current_engine = id.to_string();
            self.events.publish(DiffEvent::CurrentEngineChanged(id.to_string()));
        }
        Ok(())
    }

    pub fn fallback_engine(&self) -> &str {
        &self.fallback_engine
    }

    pub fn set_fallback_engine(&mut self, id: &str) -> Result<(), OrchestratorError> {
        self.validate_engine_id(id)?;
        if self.fallback_engine != id {
            self.fallback_engine = id.to_string();
            self.events.publish(DiffEvent::FallbackEngineChanged(id.to_string()));
        }
        Ok(())
    }

    fn validate_engine_id(&self, id: &str) -> Result<(), OrchestratorError> {
        let kind = if id.is_empty() {
            OrchestratorError::InvalidEngineId
        } else if !self.registry.is_available(id) {
            OrchestratorError::EngineNotFound
        } else {
            return Ok(());
        };
        self.runner().record_error(kind, id);
        Err(kind)
    }

    pub fn last_error(&self) -> Option<OrchestratorError> {
        lock_status(&self.status).last_error
    }

    /// Fixed message for the most recent failure, empty if none
    pub fn last_error_message(&self) -> String {
        self.last_error().map(|e| e.message()).unwrap_or_default()
    }

    /// Whether a computation started on this orchestrator is still running
    pub fn busy(&self) -> bool {
        lock_status(&self.status).in_flight > 0
    }

    /// Engine the automatic policy would pick for these inputs
    pub fn auto_select(&self, left: &str, right: &str) -> Option<String> {
        self.runner().auto_select(left, right)
    }

    pub fn compute_sync(&self, left: &str, right: &str, selection: SelectionMode, engine_id: &str) -> DiffResult {
        let _in_flight = InFlight::start(&self.status);
        self.runner().execute(left, right, selection, engine_id).0
    }

    pub fn compute_async(
        &self,
        left: &str,
        right: &str,
        selection: SelectionMode,
        engine_id: &str,
    ) -> DiffHandle<DiffResult> {
        let (tx, handle) = DiffHandle::channel();
        let in_flight = InFlight::start(&self.status);
        let runner = self.runner();
        let (left, right, engine_id) = (left.to_string(), right.to_string(), engine_id.to_string());

        self.executor.spawn(move || {
            let (result, _) = runner.execute(&left, &right, selection, &engine_id);
            drop(in_flight);
            let _ = tx.send(result);
        });

        handle
    }

    pub fn compute_side_by_side_sync(
        &self,
        left: &str,
        right: &str,
        selection: SelectionMode,
        engine_id: &str,
    ) -> SideBySideResult {
        let _in_flight = InFlight::start(&self.status);
        self.runner().execute_side_by_side(left, right, selection, engine_id)
    }

    pub fn compute_side_by_side_async(
        &self,
        left: &str,
        right: &str,
        selection: SelectionMode,
        engine_id: &str,
    ) -> DiffHandle<SideBySideResult> {
        let (tx, handle) = DiffHandle::channel();
        let in_flight = InFlight::start(&self.status);
        let runner = self.runner();
        let (left, right, engine_id) = (left.to_string(), right.to_string(), engine_id.to_string());

        self.executor.spawn(move || {
            let result = runner.execute_side_by_side(&left, &right, selection, &engine_id);
            drop(in_flight);
            let _ = tx.send(result);
        });

        handle
    }

    /// Diff with the stored selection and execution modes. In Sync mode the
    /// returned handle is already resolved.
    pub fn compute(&self, left: &str, right: &str) -> DiffHandle<DiffResult> {
        let engine_id = self.current_engine.clone();
        match self.execution_mode {
            ExecutionMode::Sync => DiffHandle::ready(self.compute_sync(left, right, self.selection_mode, &engine_id)),
            ExecutionMode::Async => self.compute_async(left, right, self.selection_mode, &engine_id),
        }
    }

    pub fn compute_side_by_side(&self, left: &str, right: &str) -> DiffHandle<SideBySideResult> {
        let engine_id = self.current_engine.clone();
        match self.execution_mode {
            ExecutionMode::Sync => DiffHandle::ready(self.compute_side_by_side_sync(
                left,
                right,
                self.selection_mode,
                &engine_id,
            )),
            ExecutionMode::Async => self.compute_side_by_side_async(left, right, self.selection_mode, &engine_id),
        }
    }

    /// Store configuration applied to every future instance of `id`
    pub fn set_engine_configuration(&self, id: &str, config: EngineConfig) -> Result<(), OrchestratorError> {
        self.registry.set_configuration(id, config).map_err(|err| {
            let kind = OrchestratorError::ConfigurationError;
            self.runner().record_error(kind, &err.to_string());
            kind
        })
    }

    pub fn engine_configuration(&self, id: &str) -> EngineConfig {
        self.registry.get_configuration(id)
    }

    /// Restore default modes and engines and clear the last error
    pub fn reset(&mut self) {
        self.selection_mode = SelectionMode::Auto;
        self.execution_mode = ExecutionMode::Sync;
        self.diff_mode = DiffMode::Auto;
        self.current_engine = self.config.default_engine.clone();
        self.fallback_engine = self.config.default_fallback.clone();
        self.error_output_enabled = self.config.error_output_enabled;
        lock_status(&self.status).last_error = None;
        self.events.publish(DiffEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeKind, DiffEngine, EngineCapabilities, PreciseEngine};
    use crate::core::registry::EngineInfo;

    fn orchestrator() -> DiffOrchestrator {
        DiffOrchestrator::new(Arc::new(EngineRegistry::with_builtin_engines()))
    }

    struct PanickingEngine;

    impl DiffEngine for PanickingEngine {
        fn compute(&self, _left: &str, _right: &str, _mode: DiffMode) -> DiffResult {
            panic!("engine blew up")
        }
        fn name(&self) -> &str {
            "panicking"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn capabilities(&self) -> EngineCapabilities {
            PreciseEngine::new().capabilities()
        }
        fn configuration(&self) -> EngineConfig {
            EngineConfig::new()
        }
        fn set_configuration(&mut self, _config: EngineConfig) {}
        fn configuration_keys(&self) -> Vec<String> {
            Vec::new()
        }
    }

    impl Default for PanickingEngine {
        fn default() -> Self {
            Self
        }
    }

    #[test]
    fn test_defaults() {
        let orch = orchestrator();
        assert_eq!(orch.selection_mode(), SelectionMode::Auto);
        assert_eq!(orch.execution_mode(), ExecutionMode::Sync);
        assert_eq!(orch.current_engine(), "dtl");
        assert_eq!(orch.fallback_engine(), "dmp");
        assert_eq!(orch.last_error(), None);
        assert_eq!(orch.last_error_message(), "");
        assert!(!orch.busy());
    }

    #[test]
    fn test_auto_selection_policy() {
        let orch = orchestrator();
        assert_eq!(orch.auto_select("small", "text").as_deref(), Some("dmp"));

        let big = "x".repeat(2000);
        assert_eq!(orch.auto_select(&big, "").as_deref(), Some("dtl"));

        // Same inputs, same answer
        assert_eq!(orch.auto_select(&big, ""), orch.auto_select(&big, ""));
    }

    #[test]
    fn test_auto_selection_falls_back() {
        let registry = Arc::new(EngineRegistry::new());
        registry.register_engine::<PreciseEngine>("only").unwrap();
        let mut orch = DiffOrchestrator::new(Arc::clone(&registry));
        assert_eq!(orch.auto_select("a", "b"), None);

        orch.set_current_engine("only").unwrap();
        assert_eq!(orch.auto_select("a", "b").as_deref(), Some("only"));
    }

    #[test]
    fn test_auto_selection_empty_registry() {
        let orch = DiffOrchestrator::new(Arc::new(EngineRegistry::new()));
        let result = orch.compute_sync("a", "b", SelectionMode::Auto, "");

        assert!(!result.ok);
        assert_eq!(orch.last_error(), Some(OrchestratorError::EngineCreationFailed));
    }

    #[test]
    fn test_manual_selection() {
        let orch = orchestrator();

        let result = orch.compute_sync("test1", "test2", SelectionMode::Manual, "dmp");
        assert!(result.ok);
        assert_eq!(orch.last_error(), None);
        assert_eq!(result.metadata("engine_id"), Some(&serde_json::Value::from("dmp")));

        let result = orch.compute_sync("test1", "test2", SelectionMode::Manual, "doesNotExist");
        assert!(!result.ok);
        assert_eq!(orch.last_error(), Some(OrchestratorError::EngineNotFound));
        assert_eq!(orch.last_error_message(), "requested engine is not registered");

        let result = orch.compute_sync("test1", "test2", SelectionMode::Manual, "");
        assert!(!result.ok);
        assert_eq!(orch.last_error(), Some(OrchestratorError::InvalidEngineId));
    }

    #[test]
    fn test_success_clears_last_error() {
        let orch = orchestrator();
        orch.compute_sync("a", "b", SelectionMode::Manual, "missing");
        assert!(orch.last_error().is_some());

        orch.compute_sync("a", "b", SelectionMode::Auto, "");
        assert_eq!(orch.last_error(), None);
    }

    #[test]
    fn test_engine_failure_preserves_text() {
        let mut orch = orchestrator();
        let result = orch.compute_sync("a b", "a c", SelectionMode::Manual, "dmp");
        assert!(result.ok);

        orch.set_diff_mode(DiffMode::Word);
        let result = orch.compute_sync("a b", "a c", SelectionMode::Manual, "dmp");
        assert!(!result.ok);
        assert_eq!(result.error_text(), "Myers-Precise does not support word mode");
        assert_eq!(orch.last_error(), Some(OrchestratorError::DiffExecutionFailed));
    }

    #[test]
    fn test_engine_panic_is_contained() {
        let registry = Arc::new(EngineRegistry::new());
        registry.register_engine::<PanickingEngine>("boom").unwrap();
        let orch = DiffOrchestrator::new(registry);

        let result = orch.compute_sync("a", "b", SelectionMode::Manual, "boom");
        assert!(!result.ok);
        assert_eq!(result.error_text(), "engine blew up");
        assert_eq!(orch.last_error(), Some(OrchestratorError::DiffExecutionFailed));
        assert!(!orch.busy());
    }

    #[test]
    fn test_factory_failure() {
        let registry = Arc::new(EngineRegistry::new());
        let info = EngineInfo::new("none", "never builds", PreciseEngine::new().capabilities()).with_factory(|| None);
        registry.register("none", info).unwrap();
        let orch = DiffOrchestrator::new(registry);

        let result = orch.compute_sync("a", "b", SelectionMode::Manual, "none");
        assert!(!result.ok);
        assert_eq!(orch.last_error(), Some(OrchestratorError::EngineCreationFailed));
    }

    #[test]
    fn test_set_engines() {
        let mut orch = orchestrator();
        let rx = orch.subscribe();

        assert!(orch.set_current_engine("dmp").is_ok());
        assert_eq!(orch.current_engine(), "dmp");
        // Unchanged value does not notify
        assert!(orch.set_current_engine("dmp").is_ok());

        assert_eq!(orch.set_current_engine(""), Err(OrchestratorError::InvalidEngineId));
        assert_eq!(orch.set_current_engine("missing"), Err(OrchestratorError::EngineNotFound));
        assert_eq!(orch.current_engine(), "dmp");

        assert!(orch.set_fallback_engine("dtl").is_ok());
        assert_eq!(orch.fallback_engine(), "dtl");
        assert!(orch.set_fallback_engine("dtl").is_ok());
        assert!(orch.set_fallback_engine("dmp").is_ok());
        assert!(orch.set_fallback_engine("dmp").is_ok());

        let names: Vec<_> = rx.try_iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "current_engine_changed",
                "error_occurred",
                "error_occurred",
                "fallback_engine_changed",
                "fallback_engine_changed"
            ]
        );
    }

    #[test]
    fn test_mode_change_events() {
        let mut orch = orchestrator();
        let rx = orch.subscribe();

        orch.set_selection_mode(SelectionMode::Manual);
        orch.set_selection_mode(SelectionMode::Manual);
        orch.set_execution_mode(ExecutionMode::Async);
        orch.set_execution_mode(ExecutionMode::Sync);

        let names: Vec<_> = rx.try_iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["selection_mode_changed", "execution_mode_changed", "execution_mode_changed"]
        );
    }

    #[test]
    fn test_sync_lifecycle_events() {
        let orch = orchestrator();
        let rx = orch.subscribe();

        orch.compute_sync("text1", "text2", SelectionMode::Auto, "");

        let names: Vec<_> = rx.try_iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["started", "finished", "diff_calculated"]);
    }

    #[test]
    fn test_failure_lifecycle_events() {
        let orch = orchestrator();
        let rx = orch.subscribe();

        orch.compute_sync("a", "b", SelectionMode::Manual, "missing");

        let events: Vec<_> = rx.try_iter().collect();
        let names: Vec<_> = events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["started", "error_occurred", "finished"]);
        match &events[1] {
            DiffEvent::ErrorOccurred { kind, message } => {
                assert_eq!(*kind, OrchestratorError::EngineNotFound);
                assert_eq!(message, "requested engine is not registered");
            }
            other => panic!("Expected ErrorOccurred, got {:?}", other),
        }
    }

    #[test]
    fn test_side_by_side_sync() {
        let orch = orchestrator();
        let result = orch.compute_side_by_side_sync("", "world", SelectionMode::Auto, "");

        assert!(result.ok());
        assert_eq!(result.engine_used, "dmp");
        assert_eq!(result.left.changes.len(), 1);
        assert_eq!(result.right.changes.len(), 1);
        assert!(result.left.changes[0].padding);
        assert_eq!(result.right.changes[0].kind, ChangeKind::Insert);
    }

    #[test]
    fn test_side_by_side_failure_on_both_sides() {
        let orch = orchestrator();
        let result = orch.compute_side_by_side_sync("a", "b", SelectionMode::Manual, "missing");

        assert!(!result.ok());
        assert!(!result.left.ok);
        assert!(!result.right.ok);
        assert_eq!(result.left.error_text, result.right.error_text);
    }

    #[test]
    fn test_configuration_error() {
        let orch = orchestrator();
        let mut config = EngineConfig::new();
        config.insert("timeout".into(), serde_json::Value::from(2));

        assert!(orch.set_engine_configuration("dmp", config.clone()).is_ok());
        assert_eq!(orch.engine_configuration("dmp"), config);

        assert_eq!(
            orch.set_engine_configuration("missing", config),
            Err(OrchestratorError::ConfigurationError)
        );
        assert_eq!(orch.last_error(), Some(OrchestratorError::ConfigurationError));
    }

    #[test]
    fn test_reset() {
        let mut orch = orchestrator();
        orch.set_selection_mode(SelectionMode::Manual);
        orch.set_execution_mode(ExecutionMode::Async);
        orch.set_current_engine("dmp").unwrap();
        orch.set_fallback_engine("dtl").unwrap();
        orch.set_error_output_enabled(true);
        orch.compute_sync("a", "b", SelectionMode::Manual, "missing");

        let rx = orch.subscribe();
        orch.reset();

        assert_eq!(orch.selection_mode(), SelectionMode::Auto);
        assert_eq!(orch.execution_mode(), ExecutionMode::Sync);
        assert_eq!(orch.current_engine(), "dtl");
        assert_eq!(orch.fallback_engine(), "dmp");
        assert!(!orch.error_output_enabled());
        assert_eq!(orch.last_error(), None);
        assert!(matches!(rx.try_recv(), Ok(DiffEvent::Reset)));
    }

    #[test]
    fn test_async_wait() {
        let orch = orchestrator();
        let rx = orch.subscribe();

        let handle = orch.compute_async("a", "b", SelectionMode::Auto, "");
        let result = handle.wait();
        assert!(result.ok);

        let calculated = rx.try_iter().filter(|e| matches!(e, DiffEvent::DiffCalculated(_))).count();
        assert_eq!(calculated, 1);
    }

    #[test]
    fn test_compute_dispatches_on_execution_mode() {
        let mut orch = orchestrator();

        let mut handle = orch.compute("same", "same");
        let result = handle.try_take().expect("sync handle should be resolved");
        assert_eq!(result.changes.len(), 1);

        orch.set_execution_mode(ExecutionMode::Async);
        let result = orch.compute("same", "same").wait();
        assert!(result.ok);
        assert_eq!(result.changes.len(), 1);
    }

    #[test]
    fn test_manual_compute_uses_current_engine() {
        let mut orch = orchestrator();
        orch.set_selection_mode(SelectionMode::Manual);
        orch.set_current_engine("dmp").unwrap();

        let result = orch.compute("abc", "abd").wait();
        assert!(result.ok);
        assert_eq!(result.metadata("engine_id"), Some(&serde_json::Value::from("dmp")));
    }
}
