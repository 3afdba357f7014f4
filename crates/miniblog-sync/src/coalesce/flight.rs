/// The outcome of a coalesced call.
///
/// Every caller attached to the same execution receives an identical `value`.
/// The only thing that differs between them is `shared`: exactly one caller
/// (the one that actually ran the work) sees `false`, everybody who joined
/// while it was running sees `true`.
///
/// `shared` does not affect correctness. It exists so callers can record
/// whether they paid for the work or piggy-backed on someone else's.
///
/// # Example
///
/// ```
/// use miniblog_sync::Group;
///
/// let group: Group<&str, Result<u32, String>> = Group::new();
/// let flight = group.call("answer", || Ok(42));
///
/// assert!(!flight.shared);
/// assert_eq!(flight.into_value(), Ok(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flight<T> {
    /// The value produced by the single execution of the work.
    pub value: T,
    /// `true` if this caller received a result produced for someone else.
    pub shared: bool,
    /// How many callers attached to the execution besides the one that ran
    /// it. Final by the time any caller observes it.
    pub waiters: usize,
}

impl<T> Flight<T> {
    pub(crate) const fn executed(value: T, waiters: usize) -> Self {
        Self {
            value,
            shared: false,
            waiters,
        }
    }

    pub(crate) const fn joined(value: T, waiters: usize) -> Self {
        Self {
            value,
            shared: true,
            waiters,
        }
    }

    /// Discards the bookkeeping and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Splits the flight into `(value, shared)`.
    pub fn into_parts(self) -> (T, bool) {
        (self.value, self.shared)
    }

    /// Maps the value while keeping the bookkeeping intact.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Flight<U> {
        Flight {
            value: f(self.value),
            shared: self.shared,
            waiters: self.waiters,
        }
    }
}

impl<V, E> Flight<Result<V, E>> {
    /// Returns `true` if the shared execution succeeded.
    pub const fn is_ok(&self) -> bool {
        self.value.is_ok()
    }

    /// Unwraps the flight into the underlying `Result`, dropping `shared`.
    ///
    /// # Errors
    ///
    /// Returns the error the work produced, verbatim.
    pub fn into_result(self) -> Result<V, E> {
        self.value
    }
}
