/// A result type for the few fallible operations `miniblog-sync` exposes.
///
/// The coalescer and the periodic worker never fail on their own; only
/// lifecycle management (see `Supervisor`) can report an error.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `miniblog-sync` can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Supervised tasks did not stop within the shutdown grace period.
    ///
    /// The cancellation scope has already been cancelled when this is
    /// returned; the remaining tasks keep running until they next observe it.
    #[error("shutdown timed out with {pending} task(s) still running")]
    ShutdownTimedOut {
        /// Number of tasks that had not finished when the grace period ended.
        pending: usize,
    },
}
