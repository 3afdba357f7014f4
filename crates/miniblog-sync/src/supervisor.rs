//! Process-lifecycle ownership of background tasks.
//!
//! A [`Supervisor`] owns the single cancellation scope of a process. Periodic
//! workers and ad-hoc tasks are spawned under it; on shutdown the scope is
//! cancelled once and the supervisor waits, up to a grace period, for every
//! tracked task to return.

use crate::{
    CancellationToken, Error, PeriodicWorker, Result, TokioSleep, WorkOutcome, WorkerHandle,
};
use core::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Owns a cancellation scope and the tasks that observe it.
///
/// Tasks are spawned onto the ambient Tokio runtime. Only the supervisor
/// cancels the scope; tasks only observe it through [`Supervisor::token`].
#[derive(Debug, Default)]
pub struct Supervisor {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the scope's token, for tasks that need to observe it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns `true` once [`Supervisor::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Spawns `worker` on its own task, sleeping with [`TokioSleep`].
    ///
    /// Returns a handle to observe the worker's state.
    pub fn spawn_periodic<W, Fut, O>(&self, worker: PeriodicWorker, work: W) -> WorkerHandle
    where
        W: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: WorkOutcome + Send + 'static,
    {
        let handle = worker.handle();
        let token = self.token.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!(worker = worker.name(), "spawning periodic worker");

        self.tracker.spawn(async move {
            worker.run::<TokioSleep, _, _, _>(&token, work).await;
        });
        handle
    }

    /// Spawns an arbitrary task that is awaited on shutdown.
    ///
    /// The task is expected to watch [`Supervisor::token`] itself.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Cancels the scope and waits up to `grace` for every task to stop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownTimedOut`] if tasks are still running when the
    /// grace period ends. They are not aborted.
    pub async fn shutdown(&self, grace: Duration) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::info!(tasks = self.tracker.len(), ?grace, "shutting down background tasks");

        self.token.cancel();
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            #[cfg(feature = "tracing")]
            tracing::info!("all background tasks stopped");
            return Ok(());
        }

        let pending = self.tracker.len();
        #[cfg(feature = "tracing")]
        tracing::warn!(pending, "background tasks outlived the shutdown grace period");
        Err(Error::ShutdownTimedOut { pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerState;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_periodic_workers() {
        let supervisor = Supervisor::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let handle = supervisor.spawn_periodic(
            PeriodicWorker::every("ticks", Duration::from_millis(10)),
            {
                let ticks = Arc::clone(&ticks);
                move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    async {}
                }
            },
        );
        tokio::time::sleep(Duration::from_millis(35)).await;

        supervisor.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(handle.state(), WorkerState::Stopped);
        assert_eq!(supervisor.running(), 0);
        assert!(ticks.load(Ordering::SeqCst) >= 3);

        // Nothing runs after shutdown returned.
        let after = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_observe_the_shared_token() {
        let supervisor = Supervisor::new();
        let token = supervisor.token();
        let task = supervisor.spawn(async move {
            token.cancelled().await;
            "done"
        });

        assert!(!supervisor.is_shutting_down());
        supervisor.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(supervisor.is_shutting_down());
        assert_eq!(task.await.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_tasks_time_out() {
        let supervisor = Supervisor::new();
        supervisor.spawn(tokio::time::sleep(Duration::from_secs(3600)));

        let err = supervisor
            .shutdown(Duration::from_millis(100))
            .await
            .unwrap_err();

        assert_eq!(err, Error::ShutdownTimedOut { pending: 1 });
        assert!(supervisor.token().is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_without_tasks_is_immediate() {
        let supervisor = Supervisor::new();
        supervisor.shutdown(Duration::ZERO).await.unwrap();
    }
}
