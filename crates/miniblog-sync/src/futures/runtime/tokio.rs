use crate::futures::SleepProvider;
use core::{future::Future, time::Duration};
use std::time::Instant;

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the provider to use for workers running on a Tokio runtime. Its
/// clock follows `tokio::time`, so paused or auto-advanced test time drives
/// fixed-rate schedules too.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }

    fn yield_now() -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }

    fn now() -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Ignores the requested duration and yields to the scheduler instead, so a
/// worker paced with it re-runs as soon as other tasks have had a turn. Mostly
/// useful in tests and for busy pollers where a timer wheel round trip costs
/// more than the work itself.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }

    fn yield_now() -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }

    fn now() -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancellationToken, Wake, sleep_or_cancel};

    #[tokio::test(start_paused = true)]
    async fn sleep_follows_paused_clock() {
        let start = TokioSleep::now();
        TokioSleep::sleep_for(Duration::from_secs(30)).await;
        assert!(TokioSleep::now() - start >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_a_long_sleep_short() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();

        let canceller = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            }
        });

        let wake = sleep_or_cancel::<TokioSleep>(&token, Duration::from_secs(3600)).await;
        canceller.await.unwrap();

        assert_eq!(wake, Wake::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn untouched_token_lets_the_timer_elapse() {
        let token = CancellationToken::new();
        let wake = sleep_or_cancel::<TokioSleep>(&token, Duration::from_millis(10)).await;
        assert_eq!(wake, Wake::Elapsed);
    }

    #[tokio::test]
    async fn yield_ignores_duration() {
        let start = std::time::Instant::now();
        TokioYield::sleep_for(Duration::from_secs(3600)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
