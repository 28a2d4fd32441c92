//! Wait for a handle from ordinary blocking code.
//!
//! Each call first checks that the caller is not running on the executor that
//! will deliver the result, since blocking that executor would stop the
//! result from ever arriving. It then registers continuations that write the
//! outcome into a slot shared with the caller and release a [`Signal`].
//! Registration always comes before the wait, so a handle that has already
//! settled still wakes the caller.
//!
//! There is no timeout. A handle that never settles, and whose producer is
//! never dropped, blocks the caller forever.
use std::sync::{Arc, Mutex};

use crate::{executor, lock, pair, signal::Signal, Error, Executor, ExecutorId, Fulfil, Settle};

/// What a continuation left for the blocked caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome<T, E> {
    /// Nothing was written. The signal only fires in this state when every
    /// continuation was dropped without running.
    Unset,
    Value(T),
    Failure(E),
}

impl<T, E> Default for Outcome<T, E> {
    fn default() -> Self {
        Outcome::Unset
    }
}

impl<T, E> Outcome<T, E> {
    fn is_unset(&self) -> bool {
        matches!(self, Outcome::Unset)
    }

    /// An unset outcome becomes [`Error::Abandoned`].
    fn into_result(self) -> Result<T, Error<E>> {
        match self {
            Outcome::Value(value) => Ok(value),
            Outcome::Failure(err) => Err(Error::Failed(err)),
            Outcome::Unset => Err(Error::Abandoned),
        }
    }
}

struct Slot<T, E> {
    outcome: Mutex<Outcome<T, E>>,
    signal: Signal,
}

/// The writing side of a [`Slot`], shared by the continuations of one call.
///
/// Dropping the last copy releases the signal, written or not.
struct Completion<T, E> {
    slot: Arc<Slot<T, E>>,
}

impl<T, E> Completion<T, E> {
    fn complete(&self, outcome: Outcome<T, E>) {
        {
            let mut slot = lock(&self.slot.outcome);
            if slot.is_unset() {
                *slot = outcome;
            } else {
                tracing::trace!("handle settled twice, keeping the first outcome");
            }
        }
        self.slot.signal.release();
    }
}

impl<T, E> Drop for Completion<T, E> {
    fn drop(&mut self) {
        if self.slot.signal.release() {
            tracing::debug!("continuations dropped before the handle settled");
        }
    }
}

/// Register through `register`, then park until a continuation has run or
/// been dropped.
fn block<T, E>(register: impl FnOnce(Arc<Completion<T, E>>)) -> Outcome<T, E> {
    let slot = Arc::new(Slot {
        outcome: Mutex::new(Outcome::Unset),
        signal: Signal::new(),
    });
    register(Arc::new(Completion { slot: slot.clone() }));
    slot.signal.wait();
    let mut outcome = lock(&slot.outcome);
    std::mem::take(&mut *outcome)
}

/// The executor's id, when the caller is running on it.
fn same_queue<X>(executor: &X) -> Option<ExecutorId>
where
    X: Executor + ?Sized,
{
    let id = executor.id();
    if executor::current() != Some(id) {
        return None;
    }
    tracing::debug!(executor = %id, "refusing to block the executor that delivers the result");
    Some(id)
}

/// Run `body` on `executor` and block until it returns.
///
/// The same-queue check happens before `body` is submitted, so a rejected
/// call never runs it.
///
/// ```
/// use promise_await::{await_body, Error, Queue};
///
/// let background = Queue::new("background").expect("spawn queue");
/// let err = await_body(&background, || Err::<(), _>("disk full"));
/// assert_eq!(err, Err(Error::Failed("disk full")));
/// ```
pub fn await_body<X, B, T, E>(executor: &X, body: B) -> Result<T, Error<E>>
where
    X: Executor + Clone + Send + 'static,
    B: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    if let Some(id) = same_queue(executor) {
        return Err(Error::SameQueue(id));
    }
    await_fallible(pair::spawn(executor, body), executor)
}

/// Block until `handle` settles, with its continuations running on
/// `executor`.
///
/// Returns the value, or the handle's own failure inside [`Error::Failed`].
/// Fails with [`Error::SameQueue`] without registering anything when called
/// from `executor` itself.
pub fn await_fallible<H, X>(handle: H, executor: &X) -> Result<H::Output, Error<H::Error>>
where
    H: Settle,
    H::Output: Send + 'static,
    H::Error: Send + 'static,
    X: Executor + Clone + Send + 'static,
{
    if let Some(id) = same_queue(executor) {
        return Err(Error::SameQueue(id));
    }
    let outcome = block(|completion| {
        let on_failure = completion.clone();
        tracing::trace!(executor = %executor.id(), "waiting on fallible handle");
        handle.on_settle(
            executor,
            move |value| completion.complete(Outcome::Value(value)),
            move |err| on_failure.complete(Outcome::Failure(err)),
        );
    });
    outcome.into_result()
}

/// Block until `handle` delivers its value on `executor`.
///
/// After the same-queue check the only failure left is
/// [`Error::Abandoned`].
///
/// ```
/// use promise_await::{await_infallible, guarantee, Queue};
///
/// let worker = Queue::new("worker").expect("spawn queue");
/// let handle = guarantee::spawn(&worker, || "done");
/// assert_eq!(await_infallible(handle, &worker), Ok("done"));
/// ```
pub fn await_infallible<H, X>(handle: H, executor: &X) -> Result<H::Output, Error>
where
    H: Fulfil,
    H::Output: Send + 'static,
    X: Executor + Clone + Send + 'static,
{
    if let Some(id) = same_queue(executor) {
        return Err(Error::SameQueue(id));
    }
    let outcome = block(|completion| {
        tracing::trace!(executor = %executor.id(), "waiting on infallible handle");
        handle.on_value(executor, move |value| {
            completion.complete(Outcome::Value(value))
        });
    });
    outcome.into_result()
}
