use crate::futures::SleepProvider;
use core::{future::Future, time::Duration};
use smol::Timer;

/// An implementation of [`SleepProvider`] using Smol's timer.
///
/// This is the provider to use for workers running on a Smol (or any
/// `async-io` based) executor.
pub struct SmolSleep;
impl SleepProvider for SmolSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        async move {
            Timer::after(dur).await;
        }
    }

    fn yield_now() -> impl Future<Output = ()> + Send {
        smol::future::yield_now()
    }
}

/// An implementation of [`SleepProvider`] using Smol's yield.
///
/// See [`TokioYield`](crate::TokioYield) for the trade-offs; the same apply
/// here.
pub struct SmolYield;
impl SleepProvider for SmolYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        smol::future::yield_now()
    }

    fn yield_now() -> impl Future<Output = ()> + Send {
        smol::future::yield_now()
    }
}
