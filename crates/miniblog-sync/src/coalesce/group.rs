use crate::Flight;
use parking_lot::{Condvar, Mutex};
use portable_atomic::{AtomicUsize, Ordering};
use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash, sync::Arc};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result slot of an in-flight call. Written exactly once.
enum Slot<T> {
    Pending,
    Ready(T),
    Panicked,
}

/// A single execution that callers can attach to while it runs.
struct Call<T> {
    slot: Mutex<Slot<T>>,
    done: Condvar,
    waiters: AtomicUsize,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            done: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Blocks until the executing caller publishes, then clones the value.
    fn wait(&self) -> Flight<T> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Pending => self.done.wait(&mut slot),
                Slot::Ready(value) => {
                    return Flight::joined(value.clone(), self.waiters.load(Ordering::Acquire));
                }
                Slot::Panicked => panic!("coalesced call panicked while executing"),
            }
        }
    }

    fn publish(&self, slot: Slot<T>) {
        *self.slot.lock() = slot;
        self.done.notify_all();
    }
}

/// Deduplicates concurrent blocking calls that share a key.
///
/// The first caller for a key executes the work on its own thread. Every
/// caller that arrives with the same key while that execution is running
/// blocks until it finishes and receives a clone of the same value. Once the
/// result has been handed out the key is free again, so the next call starts
/// a fresh execution: results are never cached.
///
/// The internal lock protects only the `key -> call` mapping. It is never held
/// while the work runs, so calls with different keys proceed in parallel.
///
/// Errors are values like any other: use `T = Result<V, E>` and the error is
/// shared with every waiter without being wrapped or retried. If the work
/// panics, the panic continues on the executing thread and every attached
/// waiter panics too.
///
/// For `async` callers see [`AsyncGroup`](crate::AsyncGroup).
///
/// # Example
///
/// ```
/// use miniblog_sync::Group;
/// use std::{sync::Arc, thread, time::Duration};
///
/// let group = Arc::new(Group::<String, u64>::new());
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let group = Arc::clone(&group);
///         thread::spawn(move || {
///             group.call("expensive".to_string(), || {
///                 thread::sleep(Duration::from_millis(50));
///                 7
///             })
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap().value, 7);
/// }
/// ```
pub struct Group<K, T> {
    calls: Mutex<HashMap<K, Arc<Call<T>>>>,
}

impl<K, T> Group<K, T>
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

    /// Executes `work` for `key`, or joins the execution already running for
    /// it.
    ///
    /// Returns the value together with whether it was shared (see
    /// [`Flight`]). The calling thread blocks until the value is available.
    ///
    /// # Panics
    ///
    /// Propagates a panic raised by `work`, both on the executing thread and
    /// on every thread that was waiting for it.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn call<F>(&self, key: K, work: F) -> Flight<T>
    where
        F: FnOnce() -> T,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(&key) {
                call.waiters.fetch_add(1, Ordering::AcqRel);
                let call = Arc::clone(call);
                drop(calls);

                #[cfg(feature = "tracing")]
                tracing::trace!("joining in-flight call");
                return call.wait();
            }

            let call = Arc::new(Call::new());
            calls.insert(key.clone(), Arc::clone(&call));
            call
        };

        let mut leader = Leader {
            calls: &self.calls,
            key,
            call: &call,
            finished: false,
        };
        let value = work();
        let waiters = leader.finish(Slot::Ready(value.clone()));

        #[cfg(feature = "tracing")]
        tracing::trace!(waiters, "in-flight call completed");
        Flight::executed(value, waiters)
    }

    /// Detaches the in-flight call for `key`, if any.
    ///
    /// Callers already attached still receive that call's value, but the next
    /// call for `key` starts a new execution instead of joining it. Returns
    /// `true` if a call was detached.
    pub fn forget<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.calls.lock().remove(key).is_some()
    }

    /// Returns `true` if a call for `key` is currently executing.
    pub fn is_in_flight<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.calls.lock().contains_key(key)
    }

    /// Number of callers currently blocked on the call for `key`, or `None`
    /// if nothing is executing for it.
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

    /// Number of keys with an executing call.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns `true` if nothing is executing.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

impl<K, T> Default for Group<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> fmt::Debug for Group<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

/// Owns the executing side of a call until its value is published.
///
/// If the work unwinds, `Drop` detaches the call and marks it panicked so no
/// waiter blocks forever.
struct Leader<'a, K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    calls: &'a Mutex<HashMap<K, Arc<Call<T>>>>,
    key: K,
    call: &'a Arc<Call<T>>,
    finished: bool,
}

impl<K, T> Leader<'_, K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    /// Removes the mapping entry, then publishes. Returns the final number of
    /// attached waiters.
    fn finish(&mut self, slot: Slot<T>) -> usize {
        self.finished = true;
        {
            let mut calls = self.calls.lock();
            // `forget` may have replaced the entry with a newer call.
            let ours = calls
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, self.call));
            if ours {
                calls.remove(&self.key);
            }
        }
        let waiters = self.call.waiters.load(Ordering::Acquire);
        self.call.publish(slot);
        waiters
    }
}

impl<K, T> Drop for Leader<'_, K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.finished {
            #[cfg(feature = "tracing")]
            tracing::warn!("in-flight call panicked, failing attached waiters");
            self.finish(Slot::Panicked);
        }
    }
}
