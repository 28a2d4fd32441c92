//! Block a thread on a promise whose result is delivered on another serial
//! queue.
//!
//! The handles in [`pair`] and [`guarantee`] settle through callbacks that run
//! on an [`Executor`]. The functions in [`bridge`] turn that callback shape
//! back into a plain return value: they register the callbacks, park the
//! calling thread on a one-shot [`signal::Signal`] and hand back whatever the
//! callback stored.
//!
//! # Examples
//!
//! ```
//! use promise_await::{await_body, Queue};
//!
//! let background = Queue::new("background").expect("spawn queue");
//! let answer = await_body(&background, || Ok::<_, String>(6 * 7));
//! assert_eq!(answer, Ok(42));
//! ```
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod bridge;
pub mod executor;
pub mod guarantee;
pub mod pair;
pub mod signal;

pub use bridge::{await_body, await_fallible, await_infallible};
pub use executor::{current, enter, Executor, ExecutorId, Job, Queue};

/// Everything an await can fail with.
///
/// `E` is the failure type of the awaited handle. Infallible handles use the
/// default, so their only reachable variants are [`Error::SameQueue`] and
/// [`Error::Abandoned`]. `Display` is only implemented when `E: Display`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error<E = Infallible> {
    /// The caller is running on the queue that would deliver the result.
    #[error("operation aborted: same queue {0}; blocking it would prevent the result from ever being delivered")]
    SameQueue(ExecutorId),
    /// The handle settled with a failure. The value is the producer's own.
    #[error("{0}")]
    Failed(E),
    /// The handle was dropped, or its continuation discarded, before it
    /// settled.
    #[error("handle was abandoned before it settled")]
    Abandoned,
}

impl<E> Error<E> {
    /// The producer's failure, if that is what this is.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Error::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_same_queue(&self) -> bool {
        matches!(self, Error::SameQueue(_))
    }
}

/// The producing half of a one-shot handle.
pub trait Promise {
    type Output;
    type Waiter;

    fn new() -> (Self, Self::Waiter)
    where
        Self: Sized;

    fn resolve(self, value: Self::Output);
}

/// A handle that settles with either a value or a failure.
pub trait Settle {
    type Output;
    type Error;

    /// Register the continuations for this handle. Exactly one of them is
    /// submitted to `executor`, exactly once, even if the handle has already
    /// settled.
    fn on_settle<X, V, F>(self, executor: &X, on_value: V, on_failure: F)
    where
        X: Executor + Clone + Send + 'static,
        V: FnOnce(Self::Output) + Send + 'static,
        F: FnOnce(Self::Error) + Send + 'static;
}

/// A handle that always settles with a value.
pub trait Fulfil {
    type Output;

    /// Register the continuation for this handle. It is submitted to
    /// `executor` exactly once, even if the handle has already settled.
    fn on_value<X, V>(self, executor: &X, on_value: V)
    where
        X: Executor + Clone + Send + 'static,
        V: FnOnce(Self::Output) + Send + 'static;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
