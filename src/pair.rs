use std::fmt;
use std::sync::{Arc, Mutex};
use std::{
    future::Future,
    task::{Poll, Waker},
};
use crate::{lock, Error, Executor, Job, Promise, Settle};

/// This `pair::Producer` promise settles exactly one consumer, with either a
/// value or a failure. The consumer can be awaited as a future, or handed a
/// pair of continuations that run on an executor.
///
/// # Examples
///
/// ```
/// use promise_await::{Promise, pair::Producer};
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, consumer) = Producer::<String, String>::new();
///
/// let task1 = thread::spawn(move || block_on(async {
///     println!("Received {:?}",  consumer.await);
/// }));
/// promise.resolve("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
pub struct Producer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

pub struct Consumer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum Waiter<T, E> {
    Task(Waker),
    Continuation(Continuation<T, E>),
}

#[derive(Debug)]
enum WakerState {
    Fresh,
    /// The producer settled or went away.
    Tainted,
}

struct Inner<T, E> {
    value: Option<Result<T, E>>,
    waiter: Result<Waiter<T, E>, WakerState>,
}

impl<T, E> Producer<T, E> {
    /// Settle with a failure.
    ///
    /// ```
    /// use promise_await::{Error, Promise, pair::Producer};
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<(), String>::new();
    /// let task1 = thread::spawn(move || block_on(op_a));
    /// op.reject(String::from("💥"));
    /// let received = task1.join().expect("The task1 thread has panicked");
    /// assert_eq!(received, Err(Error::Failed(String::from("💥"))));
    /// ```
    pub fn reject(self, err: E) {
        self.settle(Err(err));
    }

    fn settle(&self, result: Result<T, E>) {
        let mut promise = lock(&self.promise);
        match std::mem::replace(&mut promise.waiter, Err(WakerState::Tainted)) {
            Ok(Waiter::Continuation(continuation)) => {
                drop(promise);
                continuation(result);
            }
            Ok(Waiter::Task(waker)) => {
                promise.value = Some(result);
                drop(promise);
                waker.wake();
            }
            Err(_) => promise.value = Some(result),
        }
    }
}

impl<T, E> Promise for Producer<T, E> {
    type Output = T;
    type Waiter = Consumer<T, E>;

    /// Settle with a value.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_await::pair::Producer;
    /// use promise_await::Promise;
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<String, ()>::new();
    /// let task1 = thread::spawn(move || block_on(async {
    ///     println!("我等到了{:?}",  op_a.await.unwrap());
    /// }));
    /// let task2 = thread::spawn(move || op.resolve(String::from("🍓")));
    /// task1.join().expect("The task1 thread has panicked");
    /// task2.join().expect("The task2 thread has panicked");
    /// ```
    fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    fn new() -> (Self, Consumer<T, E>) {
        let inner = Arc::new(Mutex::new(Inner {
            value: None,
            waiter: Err(WakerState::Fresh),
        }));
        (Self { promise: inner.clone() }, Consumer { promise: inner })
    }
}

impl<T, E> Drop for Producer<T, E> {
    /// If this is an unsettled producer, wake the waiting task with an error
    /// and drop any continuation without running it.
    fn drop(&mut self) {
        let mut promise = lock(&self.promise);
        let waiter = std::mem::replace(&mut promise.waiter, Err(WakerState::Tainted));
        drop(promise);
        match waiter {
            Ok(Waiter::Task(waker)) => waker.wake(),
            Ok(Waiter::Continuation(_)) => tracing::trace!("producer dropped before settling"),
            Err(_) => {}
        }
    }
}

impl<T, E> Consumer<T, E> {
    fn register(self, continuation: Continuation<T, E>) {
        let mut promise = lock(&self.promise);
        if let Some(result) = promise.value.take() {
            drop(promise);
            continuation(result);
            return;
        }
        if matches!(promise.waiter, Err(WakerState::Tainted)) {
            drop(promise);
            tracing::trace!("continuation registered on an abandoned handle");
        } else {
            promise.waiter = Ok(Waiter::Continuation(continuation));
        }
    }
}

impl<T, E> Settle for Consumer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn on_settle<X, V, F>(self, executor: &X, on_value: V, on_failure: F)
    where
        X: Executor + Clone + Send + 'static,
        V: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        let executor = executor.clone();
        self.register(Box::new(move |result| {
            let job: Job = match result {
                Ok(value) => Box::new(move || on_value(value)),
                Err(err) => Box::new(move || on_failure(err)),
            };
            executor.submit(job);
        }));
    }
}

impl<T, E> Future for Consumer<T, E> {
    type Output = Result<T, Error<E>>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let mut promise = lock(&self.promise);
        match promise.value.take() {
            Some(value) => Poll::Ready(value.map_err(Error::Failed)),
            None if matches!(promise.waiter, Err(WakerState::Tainted)) => {
                Poll::Ready(Err(Error::Abandoned))
            }
            None => {
                promise.waiter = Ok(Waiter::Task(cx.waker().clone()));
                Poll::Pending
            }
        }
    }
}

impl<T, E> fmt::Debug for Producer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Consumer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").finish_non_exhaustive()
    }
}

/// Run `body` on `executor` and return a handle to its result.
///
/// A body that panics abandons the handle.
pub fn spawn<X, B, T, E>(executor: &X, body: B) -> Consumer<T, E>
where
    X: Executor + ?Sized,
    B: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (producer, consumer) = Producer::new();
    executor.submit(Box::new(move || match body() {
        Ok(value) => producer.resolve(value),
        Err(err) => producer.reject(err),
    }));
    consumer
}
