use super::{CancellationToken, SleepProvider};
use core::time::Duration;
use futures::{FutureExt, pin_mut, select_biased};

/// Why a cancellable wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wake {
    /// The full duration elapsed and the token was still live.
    Elapsed,
    /// The token was cancelled before (or at the same time as) the timer.
    Cancelled,
}

impl Wake {
    /// Returns `true` if the wait was cut short by cancellation.
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Sleeps for `dur` unless `token` is cancelled first.
///
/// The two conditions race, and cancellation wins whenever both are ready in
/// the same poll. An already-cancelled token returns immediately without
/// arming the timer.
///
/// # Example
///
/// ```
/// # #[cfg(feature = "async-tokio")]
/// # {
/// use miniblog_sync::{CancellationToken, TokioSleep, Wake, sleep_or_cancel};
/// use std::time::Duration;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let wake = sleep_or_cancel::<TokioSleep>(&token, Duration::from_secs(3600)).await;
/// assert_eq!(wake, Wake::Cancelled);
/// # });
/// # }
/// ```
pub async fn sleep_or_cancel<S>(token: &CancellationToken, dur: Duration) -> Wake
where
    S: SleepProvider,
{
    if token.is_cancelled() {
        return Wake::Cancelled;
    }

    let cancelled = token.cancelled().fuse();
    let elapsed = S::sleep_for(dur).fuse();
    pin_mut!(cancelled, elapsed);

    select_biased! {
        () = cancelled => Wake::Cancelled,
        () = elapsed => Wake::Elapsed,
    }
}
