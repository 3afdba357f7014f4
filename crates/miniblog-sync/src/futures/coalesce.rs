use crate::Flight;
use core::{future::Future, panic::AssertUnwindSafe};
use futures::{FutureExt, channel::oneshot, future::Shared};
use parking_lot::Mutex;
use portable_atomic::{AtomicUsize, Ordering};
use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash, sync::Arc};

/// What the executing caller hands to everyone attached to its call.
#[derive(Clone)]
enum Settled<T> {
    Ready { value: T, waiters: usize },
    Panicked,
}

/// An in-flight call as seen from the mapping.
///
/// `waiters` doubles as the call's identity: two entries for the same key are
/// the same call only if they share this allocation.
struct Call<T> {
    waiters: Arc<AtomicUsize>,
    done: Shared<oneshot::Receiver<Settled<T>>>,
}

/// Deduplicates concurrent `async` calls that share a key.
///
/// The async counterpart of [`Group`](crate::Group): the first caller for a
/// key awaits the work on its own task, and callers that arrive while it is
/// pending suspend until it completes, then receive a clone of the same value.
/// Completion is signalled through a runtime-agnostic channel, so the group
/// works the same under Tokio, Smol or any other executor.
///
/// The mapping lock is a plain mutex that is never held across an `.await`.
///
/// # Cancellation
///
/// Callers cannot abandon a call they joined; they can only stop waiting for
/// it. If the *executing* caller's future is dropped before the work
/// finishes, its entry is removed and the attached callers run the protocol
/// again, so one of them becomes the new executor. No caller ever receives a
/// value that was not produced by a completed execution.
///
/// # Example
///
/// ```
/// use miniblog_sync::AsyncGroup;
///
/// # futures::executor::block_on(async {
/// let group: AsyncGroup<String, Result<u64, String>> = AsyncGroup::new();
///
/// let (release, released) = futures::channel::oneshot::channel::<()>();
///
/// let (a, b, ()) = futures::join!(
///     group.call("user:1".to_string(), || async move {
///         released.await.ok();
///         Ok(1)
///     }),
///     group.call("user:1".to_string(), || async { Ok(2) }),
///     async { release.send(()).unwrap() },
/// );
///
/// // The second call joined the first one and never ran its own work.
/// assert_eq!(a.value, Ok(1));
/// assert_eq!(b.value, Ok(1));
/// assert!(!a.shared && b.shared);
/// # });
/// ```
pub struct AsyncGroup<K, T> {
    calls: Mutex<HashMap<K, Call<T>>>,
}

impl<K, T> AsyncGroup<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Awaits `work` for `key`, or joins the call already pending for it.
    ///
    /// # Panics
    ///
    /// If `work` panics, the panic is resumed on the executing caller and
    /// every attached caller panics as well.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn call<F, Fut>(&self, key: K, work: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (tx, waiters) = loop {
            let done = {
                let mut calls = self.calls.lock();
                match calls.get(&key) {
                    Some(call) => {
                        call.waiters.fetch_add(1, Ordering::AcqRel);
                        call.done.clone()
                    }
                    None => {
                        let (tx, rx) = oneshot::channel();
                        let waiters = Arc::new(AtomicUsize::new(0));
                        calls.insert(
                            key.clone(),
                            Call {
                                waiters: Arc::clone(&waiters),
                                done: rx.shared(),
                            },
                        );
                        break (tx, waiters);
                    }
                }
            };

            match done.await {
                Ok(Settled::Ready { value, waiters }) => return Flight::joined(value, waiters),
                Ok(Settled::Panicked) => panic!("coalesced call panicked while executing"),
                Err(oneshot::Canceled) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("executing caller went away, retrying");
                }
            }
        };

        let mut leader = Leader {
            calls: &self.calls,
            key,
            waiters: &waiters,
            tx: Some(tx),
        };

        match AssertUnwindSafe(async move { work().await })
            .catch_unwind()
            .await
        {
            Ok(value) => {
                let waiters = leader.settle(Settled::Ready {
                    value: value.clone(),
                    waiters: 0,
                });
                Flight::executed(value, waiters)
            }
            Err(payload) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("in-flight call panicked, failing attached waiters");
                leader.settle(Settled::Panicked);
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Detaches the pending call for `key`, if any.
    ///
    /// Callers already attached still receive that call's value; the next
    /// call for `key` starts a new execution. Returns `true` if a call was
    /// detached.
    pub fn forget<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.calls.lock().remove(key).is_some()
    }

    /// Returns `true` if a call for `key` is currently pending.
    pub fn is_in_flight<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.calls.lock().contains_key(key)
    }

    /// Number of callers currently suspended on the call for `key`, or `None`
    /// if nothing is pending for it.
    pub fn waiting<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.calls
            .lock()
            .get(key)
            .map(|call| call.waiters.load(Ordering::Acquire))
    }

    /// Number of keys with a pending call.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

impl<K, T> Default for AsyncGroup<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> fmt::Debug for AsyncGroup<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncGroup")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

struct Leader<'a, K, T>
where
    K: Eq + Hash,
{
    calls: &'a Mutex<HashMap<K, Call<T>>>,
    key: K,
    waiters: &'a Arc<AtomicUsize>,
    tx: Option<oneshot::Sender<Settled<T>>>,
}

impl<K, T> Leader<'_, K, T>
where
    K: Eq + Hash,
{
    /// Removes our mapping entry (unless `forget` already replaced it) and
    /// returns the final waiter count.
    fn detach(&self) -> usize {
        let mut calls = self.calls.lock();
        let ours = calls
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(&current.waiters, self.waiters));
        if ours {
            calls.remove(&self.key);
        }
        self.waiters.load(Ordering::Acquire)
    }

    fn settle(&mut self, settled: Settled<T>) -> usize {
        let waiters = self.detach();
        let settled = match settled {
            Settled::Ready { value, .. } => Settled::Ready { value, waiters },
            Settled::Panicked => Settled::Panicked,
        };
        if let Some(tx) = self.tx.take() {
            // Nobody attached: the receiver half lives only in the (now
            // removed) entry.
            let _ = tx.send(settled);
        }
        waiters
    }
}

impl<K, T> Drop for Leader<'_, K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.tx.is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("in-flight call abandoned before completion");
            // Dropping the sender wakes attached callers with `Canceled`.
            self.detach();
        }
    }
}
