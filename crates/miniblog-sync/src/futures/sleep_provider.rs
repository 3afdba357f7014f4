use core::{future::Future, time::Duration};
use std::time::Instant;

/// A trait that abstracts over how to sleep for a given [`Duration`] in async
/// contexts.
///
/// This allows the periodic worker and the cancellable wait to be generic over
/// runtimes like `Tokio` or `Smol`.
pub trait SleepProvider {
    /// Returns a future that completes once `dur` has elapsed. We require
    /// `Send` so that the future can be safely moved across threads.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;

    /// Returns a future that gives the runtime's other tasks a turn before
    /// completing.
    fn yield_now() -> impl Future<Output = ()> + Send;

    /// The provider's notion of "now".
    ///
    /// Used to schedule fixed-rate ticks. Providers whose runtime can pause or
    /// mock time override this so ticks follow the runtime clock.
    fn now() -> Instant {
        Instant::now()
    }
}
