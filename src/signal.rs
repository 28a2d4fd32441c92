//! A one-shot completion signal.
//!
//! [`Signal::wait`] parks the OS thread until some other thread calls
//! [`Signal::release`]. Only the first release counts; waiting on a signal
//! that was already released returns at once.
use std::sync::{Condvar, Mutex, PoisonError};

use crate::lock;

#[derive(Debug, Default)]
pub struct Signal {
    released: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every waiter. Returns `false` if the signal had already been
    /// released.
    pub fn release(&self) -> bool {
        let mut released = lock(&self.released);
        if *released {
            return false;
        }
        *released = true;
        self.condvar.notify_all();
        true
    }

    /// Block until the signal is released. There is no timeout.
    pub fn wait(&self) {
        let released = lock(&self.released);
        let _released = self
            .condvar
            .wait_while(released, |released| !*released)
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub fn is_released(&self) -> bool {
        *lock(&self.released)
    }
}

#[cfg(test)]
mod tests {
    use super::Signal;
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn test_release_only_once() {
        let signal = Signal::new();
        assert!(!signal.is_released());
        assert!(signal.release());
        assert!(!signal.release());
        assert!(signal.is_released());
    }

    #[test]
    fn test_wait_after_release_returns() {
        let signal = Signal::new();
        signal.release();
        signal.wait();
        signal.wait();
    }

    #[test]
    fn test_wait_blocks_until_release() {
        let signal = Arc::new(Signal::new());
        let releaser = signal.clone();
        let delay = Duration::from_millis(100);
        let start = Instant::now();
        let task = thread::spawn(move || {
            thread::sleep(delay);
            releaser.release();
        });
        signal.wait();
        assert!(start.elapsed() >= delay);
        task.join().expect("The releasing thread has panicked");
    }

    #[test]
    fn test_release_wakes_every_waiter() {
        let signal = Arc::new(Signal::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.wait())
            })
            .collect();
        signal.release();
        for waiter in waiters {
            waiter.join().expect("A waiting thread has panicked");
        }
    }
}
