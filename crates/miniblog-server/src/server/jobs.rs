//! Background jobs run under the process [`Supervisor`].

use crate::server::telemetry::increment_job_iterations;
use core::time::Duration;
use miniblog_core::{Error, UserStore};
use miniblog_sync::{PeriodicWorker, Supervisor, WorkerHandle};
use std::sync::Arc;

pub const USER_STATS_JOB: &str = "user-stats";

/// Periodically logs how many users the store holds.
///
/// Store failures are logged by the worker and the job keeps its schedule.
pub fn spawn_stats_job(
    supervisor: &Supervisor,
    store: Arc<dyn UserStore>,
    interval: Duration,
) -> WorkerHandle {
    supervisor.spawn_periodic(PeriodicWorker::every(USER_STATS_JOB, interval), move || {
        let store = Arc::clone(&store);
        async move {
            let users = store.count().await?;
            increment_job_iterations(USER_STATS_JOB);
            tracing::info!(users, "user statistics");
            Ok::<(), Error>(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::store::MemoryStore;
    use async_trait::async_trait;
    use miniblog_core::{Result, User};
    use miniblog_sync::WorkerState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every call and counts how often it was asked.
    #[derive(Default)]
    struct BrokenStore {
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn fail<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Store {
                context: "disk on fire".to_string(),
            })
        }
    }

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn create(&self, _user: User) -> Result<()> {
            self.fail()
        }
        async fn get(&self, _username: &str) -> Result<User> {
            self.fail()
        }
        async fn update(&self, _user: User) -> Result<()> {
            self.fail()
        }
        async fn list(&self, _offset: usize, _limit: usize) -> Result<(u64, Vec<User>)> {
            self.fail()
        }
        async fn delete(&self, _username: &str) -> Result<()> {
            self.fail()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stats_job_stops_with_the_supervisor() {
        let supervisor = Supervisor::new();
        let handle = spawn_stats_job(
            &supervisor,
            Arc::new(MemoryStore::new()),
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(handle.name(), USER_STATS_JOB);
        assert_eq!(handle.state(), WorkerState::Waiting);

        supervisor.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.state(), WorkerState::Stopped);
        assert_eq!(supervisor.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_store_keeps_the_job_alive() {
        let supervisor = Supervisor::new();
        let store = Arc::new(BrokenStore::default());
        let handle = spawn_stats_job(&supervisor, store.clone(), Duration::from_secs(10));

        // Runs at 0s, 10s, 20s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handle.state(), WorkerState::Waiting);

        supervisor.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.state(), WorkerState::Stopped);
    }
}
