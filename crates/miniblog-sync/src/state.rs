use portable_atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a periodic worker.
///
/// A worker moves through these states in a fixed pattern:
///
/// ```text
/// Idle -> Running -> Waiting -> Running -> ... -> Stopped
///            \___________\____________________/
/// ```
///
/// `Stopped` is terminal: once a worker has observed cancellation it never
/// runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed but not yet started.
    Idle = 0,
    /// Executing the work unit.
    Running = 1,
    /// Between invocations, waiting for the next one to become due.
    Waiting = 2,
    /// Cancellation was observed and the worker returned to its owner.
    Stopped = 3,
}

impl WorkerState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Waiting,
            _ => Self::Stopped,
        }
    }

    /// Returns `true` once the worker can no longer make progress.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// A cloneable, read-only view of a worker's [`WorkerState`].
///
/// Handles are cheap to clone and can be held by the lifecycle owner, a health
/// endpoint or a test while the worker itself runs on another task.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    name: Arc<str>,
    state: Arc<AtomicU8>,
}

impl WorkerHandle {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            state: Arc::new(AtomicU8::new(WorkerState::Idle as u8)),
        }
    }

    /// The name the worker was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The most recently published state.
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_starts_idle_and_tracks_updates() {
        let handle = WorkerHandle::new(Arc::from("stats"));
        let observer = handle.clone();
        assert_eq!(observer.state(), WorkerState::Idle);
        assert_eq!(observer.name(), "stats");

        handle.set(WorkerState::Waiting);
        assert_eq!(observer.state(), WorkerState::Waiting);

        handle.set(WorkerState::Stopped);
        assert!(observer.state().is_terminal());
    }

    #[test]
    fn unknown_raw_values_are_terminal() {
        assert_eq!(WorkerState::from_u8(42), WorkerState::Stopped);
    }
}
