use super::{CancellationToken, SleepProvider, Wake, sleep_or_cancel};
use crate::{WorkerHandle, WorkerState};
use core::{fmt, future::Future, time::Duration};
use std::sync::Arc;

/// How a [`PeriodicWorker`] spaces consecutive invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pacing {
    /// Wait the given duration after each invocation completes.
    FixedDelay(Duration),
    /// Start an invocation every period, measured from the previous start.
    ///
    /// An invocation that overruns its period is followed immediately by the
    /// next one; the ticks it missed are dropped rather than replayed.
    FixedRate(Duration),
    /// Do not wait at all; only yield to the scheduler between invocations.
    Immediate,
}

/// Summary of a finished [`PeriodicWorker::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// How many times the work unit was invoked.
    pub iterations: u64,
}

/// The output of a work unit.
///
/// Failures are reported and swallowed: a failed iteration never ends the
/// loop.
pub trait WorkOutcome {
    /// Consumes the outcome of one iteration.
    fn report(self);
}

impl WorkOutcome for () {
    fn report(self) {}
}

impl<E> WorkOutcome for Result<(), E>
where
    E: fmt::Display,
{
    fn report(self) {
        if let Err(_e) = self {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "work unit failed");
        }
    }
}

/// Runs a unit of work repeatedly until its cancellation token fires.
///
/// The loop is "work first, then wait": the token is checked, the work unit
/// is invoked, the token is checked again, and only then does the worker wait
/// according to its [`Pacing`]. Cancellation that arrives during the wait
/// interrupts it immediately; cancellation that arrives during the work unit
/// is observed as soon as that invocation returns. Invocations never overlap.
///
/// The worker's progress is observable from other tasks through
/// [`PeriodicWorker::handle`].
///
/// # Example
///
/// ```
/// # #[cfg(feature = "async-tokio")]
/// # {
/// use miniblog_sync::{CancellationToken, PeriodicWorker, TokioSleep, WorkerState};
/// use std::time::Duration;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap().block_on(async {
/// let token = CancellationToken::new();
/// let worker = PeriodicWorker::every("heartbeat", Duration::from_secs(1));
/// let handle = worker.handle();
///
/// let mut beats = 0;
/// let report = worker
///     .run::<TokioSleep, _, _, _>(&token, || {
///         beats += 1;
///         if beats == 3 {
///             token.cancel();
///         }
///         async {}
///     })
///     .await;
///
/// assert_eq!(report.iterations, 3);
/// assert_eq!(handle.state(), WorkerState::Stopped);
/// # });
/// # }
/// ```
#[derive(Debug)]
pub struct PeriodicWorker {
    pacing: Pacing,
    handle: WorkerHandle,
}

impl PeriodicWorker {
    /// Creates an idle worker with the given pacing.
    pub fn new(name: impl Into<Arc<str>>, pacing: Pacing) -> Self {
        Self {
            pacing,
            handle: WorkerHandle::new(name.into()),
        }
    }

    /// Creates an idle worker that waits `interval` between invocations.
    pub fn every(name: impl Into<Arc<str>>, interval: Duration) -> Self {
        Self::new(name, Pacing::FixedDelay(interval))
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub const fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Returns a handle that observes this worker's state.
    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Drives the work loop until `token` is cancelled.
    ///
    /// A token that is already cancelled returns immediately with zero
    /// iterations. The worker ends in [`WorkerState::Stopped`].
    ///
    /// Running consumes the worker, so a job can only ever have one loop.
    /// Keep a [`PeriodicWorker::handle`] to observe it afterwards.
    ///
    /// ```compile_fail
    /// use miniblog_sync::{CancellationToken, PeriodicWorker, SleepProvider};
    ///
    /// fn start_twice<S: SleepProvider>(worker: PeriodicWorker, token: &CancellationToken) {
    ///     let _first = worker.run::<S, _, _, _>(token, || async {});
    ///     let _second = worker.run::<S, _, _, _>(token, || async {});
    /// }
    /// ```
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(worker = %self.handle.name()))
    )]
    pub async fn run<S, W, Fut, O>(self, token: &CancellationToken, mut work: W) -> RunReport
    where
        S: SleepProvider,
        W: FnMut() -> Fut,
        Fut: Future<Output = O>,
        O: WorkOutcome,
    {
        let mut report = RunReport::default();

        #[cfg(feature = "tracing")]
        tracing::info!(pacing = ?self.pacing, "worker started");

        while !token.is_cancelled() {
            self.handle.set(WorkerState::Running);
            let started = S::now();
            work().await.report();
            report.iterations += 1;

            if token.is_cancelled() {
                break;
            }

            self.handle.set(WorkerState::Waiting);
            let wake = match self.pacing {
                Pacing::FixedDelay(delay) => sleep_or_cancel::<S>(token, delay).await,
                Pacing::FixedRate(period) => {
                    let wait = started
                        .checked_add(period)
                        .map_or(period, |due| due.saturating_duration_since(S::now()));
                    sleep_or_cancel::<S>(token, wait).await
                }
                Pacing::Immediate => {
                    S::yield_now().await;
                    if token.is_cancelled() {
                        Wake::Cancelled
                    } else {
                        Wake::Elapsed
                    }
                }
            };

            if wake.is_cancelled() {
                break;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("cancellation observed");

        self.handle.set(WorkerState::Stopped);

        #[cfg(feature = "tracing")]
        tracing::info!(iterations = report.iterations, "worker stopped");

        report
    }
}
