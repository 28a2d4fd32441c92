//! A one-shot promise that cannot fail.
//!
//! Built on [`pair`](crate::pair) with [`Infallible`] as the failure type, so
//! the only way a consumer can miss its value is by the producer going away.
use std::convert::Infallible;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use crate::{pair, Error, Executor, Fulfil, Promise, Settle};

/// # Examples
///
/// ```
/// use promise_await::{Promise, guarantee::Producer};
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, consumer) = Producer::<u8>::new();
/// let task1 = thread::spawn(move || block_on(consumer));
/// promise.resolve(7);
/// assert_eq!(task1.join().expect("The task1 thread has panicked."), Ok(7));
/// ```
#[derive(Debug)]
pub struct Producer<T>(pair::Producer<T, Infallible>);

#[derive(Debug)]
pub struct Consumer<T>(pair::Consumer<T, Infallible>);

impl<T> Promise for Producer<T> {
    type Output = T;
    type Waiter = Consumer<T>;

    fn resolve(self, value: T) {
        self.0.resolve(value);
    }

    fn new() -> (Self, Consumer<T>) {
        let (producer, consumer) = pair::Producer::new();
        (Producer(producer), Consumer(consumer))
    }
}

impl<T: Send + 'static> Fulfil for Consumer<T> {
    type Output = T;

    fn on_value<X, V>(self, executor: &X, on_value: V)
    where
        X: Executor + Clone + Send + 'static,
        V: FnOnce(T) + Send + 'static,
    {
        self.0.on_settle(executor, on_value, |never| match never {});
    }
}

impl<T> Future for Consumer<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

/// Run `body` on `executor` and return a handle to its value.
pub fn spawn<X, B, T>(executor: &X, body: B) -> Consumer<T>
where
    X: Executor + ?Sized,
    B: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Consumer(pair::spawn(executor, move || Ok(body())))
}
