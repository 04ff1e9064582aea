//! Completion handles and the worker pool behind asynchronous diffs

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context, Poll};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::diff::{DiffResult, SideBySideResult};

/// Values a [`DiffHandle`] can resolve to
pub trait TaskOutput: Send + 'static {
    /// Value reported when the worker went away without sending a result
    fn abandoned() -> Self;
}

const ABANDONED_MESSAGE: &str = "diff task ended before producing a result";

impl TaskOutput for DiffResult {
    fn abandoned() -> Self {
        DiffResult::failure(ABANDONED_MESSAGE)
    }
}

impl TaskOutput for SideBySideResult {
    fn abandoned() -> Self {
        SideBySideResult::failure(ABANDONED_MESSAGE, "")
    }
}

/// Handle to a computation that completes exactly once.
///
/// Await it from async code, or call [`wait`](Self::wait) from a plain
/// thread. [`try_take`](Self::try_take) polls without blocking.
pub struct DiffHandle<T> {
    rx: oneshot::Receiver<T>,
    taken: bool,
}

impl<T: TaskOutput> DiffHandle<T> {
    pub(crate) fn channel() -> (oneshot::Sender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx, taken: false })
    }

    /// Handle that is already resolved with `value`
    pub fn ready(value: T) -> Self {
        let (tx, handle) = Self::channel();
        // The receiver is alive in `handle`, so this cannot fail
        let _ = tx.send(value);
        handle
    }

    /// Block the current thread until the result is available.
    ///
    /// Must not be called from inside an async context; `.await` the handle there.
    pub fn wait(self) -> T {
        self.rx.blocking_recv().unwrap_or_else(|_| T::abandoned())
    }

    /// Take the result if it is ready. Returns `Some` at most once.
    pub fn try_take(&mut self) -> Option<T> {
        if self.taken {
            return None;
        }
        let value = match self.rx.try_recv() {
            Ok(value) => value,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => T::abandoned(),
        };
        self.taken = true;
        Some(value)
    }
}

impl<T: TaskOutput> Future for DiffHandle<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| T::abandoned()))
    }
}

/// Runtime the orchestrator hands blocking engine runs to
pub(crate) enum Executor {
    /// Runtime the orchestrator was created inside of, or was given
    Ambient(Handle),
    /// Runtime owned by the orchestrator, built on the first spawn. `None`
    /// once building failed; jobs then run on plain threads.
    Owned {
        worker_threads: usize,
        runtime: OnceLock<Option<OwnedRuntime>>,
    },
}

impl Executor {
    pub(crate) fn detect(worker_threads: usize) -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::Ambient(handle),
            Err(_) => Self::Owned {
                worker_threads: worker_threads.max(1),
                runtime: OnceLock::new(),
            },
        }
    }

    fn build_runtime(worker_threads: usize) -> Option<OwnedRuntime> {
        match Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .max_blocking_threads(worker_threads)
            .thread_name("diffsync-worker")
            .enable_all()
            .build()
        {
            Ok(runtime) => {
                tracing::debug!(worker_threads, "started diff worker runtime");
                Some(OwnedRuntime(Some(runtime)))
            }
            Err(err) => {
                tracing::warn!("Failed to build worker runtime, using plain threads: {}", err);
                None
            }
        }
    }

    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::Ambient(handle) => {
                handle.spawn_blocking(job);
            }
            Self::Owned { worker_threads, runtime } => {
                let owned = runtime.get_or_init(|| Self::build_runtime(*worker_threads));
                match owned.as_ref().and_then(|rt| rt.0.as_ref()) {
                    Some(rt) => {
                        rt.handle().spawn_blocking(job);
                    }
                    None => {
                        std::thread::spawn(job);
                    }
                }
            }
        }
    }
}

/// Owned runtime that can be dropped from any context
pub(crate) struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_ready_handle() {
        let handle = DiffHandle::ready(DiffResult::success(Vec::new()));
        assert!(handle.wait().ok);
    }

    #[test]
    fn test_try_take_once() {
        let mut handle = DiffHandle::ready(DiffResult::failure("x"));
        assert!(handle.try_take().is_some());
        assert!(handle.try_take().is_none());
    }

    #[test]
    fn test_dropped_sender_reports_abandoned() {
        let (tx, handle) = DiffHandle::<DiffResult>::channel();
        drop(tx);

        let result = handle.wait();
        assert!(!result.ok);
        assert_eq!(result.error_text(), ABANDONED_MESSAGE);
    }

    #[test]
    fn test_owned_executor_runs_jobs() {
        let executor = Executor::detect(1);
        match &executor {
            Executor::Owned { runtime, .. } => assert!(runtime.get().is_none()),
            Executor::Ambient(_) => panic!("no runtime should be ambient in a plain test"),
        }

        let (tx, rx) = mpsc::channel();
        executor.spawn(move || {
            let _ = tx.send(42);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));

        // The runtime exists only once a job was spawned
        match &executor {
            Executor::Owned { runtime, .. } => assert!(matches!(runtime.get(), Some(Some(_)))),
            Executor::Ambient(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_ambient_executor_and_await() {
        let executor = Executor::detect(1);
        assert!(matches!(executor, Executor::Ambient(_)));

        let (tx, handle) = DiffHandle::<DiffResult>::channel();
        executor.spawn(move || {
            let _ = tx.send(DiffResult::success(Vec::new()));
        });
        assert!(handle.await.ok);
    }
}
