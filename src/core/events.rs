use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use super::error::OrchestratorError;
use super::orchestrator::{ExecutionMode, SelectionMode};
use crate::diff::{DiffResult, SideBySideResult};

/// Lifecycle notifications published by a [`DiffOrchestrator`](super::DiffOrchestrator)
#[derive(Debug, Clone)]
pub enum DiffEvent {
    SelectionModeChanged(SelectionMode),
    ExecutionModeChanged(ExecutionMode),
    CurrentEngineChanged(String),
    FallbackEngineChanged(String),
    /// A computation began; `engine_id` is empty if none could be resolved
    Started { engine_id: String },
    /// A computation ended, successfully or not
    Finished(DiffResult),
    /// A computation produced a successful result
    DiffCalculated(DiffResult),
    SideBySideDiffCalculated(SideBySideResult),
    ErrorOccurred {
        kind: OrchestratorError,
        message: String,
    },
    Reset,
}

impl DiffEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectionModeChanged(_) => "selection_mode_changed",
            Self::ExecutionModeChanged(_) => "execution_mode_changed",
            Self::CurrentEngineChanged(_) => "current_engine_changed",
            Self::FallbackEngineChanged(_) => "fallback_engine_changed",
            Self::Started { .. } => "started",
            Self::Finished(_) => "finished",
            Self::DiffCalculated(_) => "diff_calculated",
            Self::SideBySideDiffCalculated(_) => "side_by_side_diff_calculated",
            Self::ErrorOccurred { .. } => "error_occurred",
            Self::Reset => "reset",
        }
    }
}

/// Fan-out of events to any number of channel subscribers.
///
/// Cloning shares the subscriber list, so worker threads publish to the
/// same subscribers as the owning orchestrator.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<DiffEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<DiffEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, dropping disconnected ones
    pub fn publish(&self, event: DiffEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(DiffEvent::Reset);

        assert!(matches!(a.try_recv(), Ok(DiffEvent::Reset)));
        assert!(matches!(b.try_recv(), Ok(DiffEvent::Reset)));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(DiffEvent::Reset);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_iter().count(), 1);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        let worker = bus.clone();
        std::thread::spawn(move || worker.publish(DiffEvent::Started { engine_id: "dmp".into() }))
            .join()
            .unwrap();

        match rx.try_recv() {
            Ok(event) => assert_eq!(event.name(), "started"),
            Err(e) => panic!("expected started event, got {:?}", e),
        }
    }
}
