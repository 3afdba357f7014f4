mod cancel;
mod coalesce;
#[cfg(any(feature = "async-tokio", feature = "async-smol"))]
mod runtime;
mod sleep_provider;
mod worker;

#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use cancel::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use coalesce::*;
#[cfg_attr(docsrs, doc(cfg(any(feature = "async-tokio", feature = "async-smol"))))]
#[cfg(any(feature = "async-tokio", feature = "async-smol"))]
pub use runtime::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use sleep_provider::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub use worker::*;

/// The one-shot cancellation scope observed by workers.
///
/// Re-exported so owners and workers agree on a single token type without
/// depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
