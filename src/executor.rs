//! Serial execution contexts.
//!
//! An [`Executor`] runs submitted jobs one at a time. The bridge only needs to
//! submit work to it and to compare its identity with the context the caller
//! is running on, which [`current`] reports.
use std::{
    cell::Cell,
    fmt, io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread,
};

/// Identity of a serial execution context. Two equal ids mean the same
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutorId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ExecutorId {
    /// A fresh id, never handed out before in this process.
    pub fn next() -> Self {
        ExecutorId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor {
    fn id(&self) -> ExecutorId;

    /// Schedule `job`. An executor that can no longer run work drops it.
    fn submit(&self, job: Job);
}

thread_local! {
    static CURRENT: Cell<Option<ExecutorId>> = const { Cell::new(None) };
}

/// The executor the calling thread is running on, if any.
pub fn current() -> Option<ExecutorId> {
    CURRENT.with(Cell::get)
}

/// Run `f` with the calling thread marked as part of executor `id`.
///
/// Executors call this around the jobs they run so that [`current`] reports
/// them. The previous marker is restored afterward, also on unwind.
///
/// ```
/// use promise_await::executor::{current, enter, ExecutorId};
///
/// let id = ExecutorId::next();
/// assert_eq!(enter(id, current), Some(id));
/// assert_eq!(current(), None);
/// ```
pub fn enter<R>(id: ExecutorId, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<ExecutorId>);

    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT.with(|current| current.set(self.0));
        }
    }

    let _restore = Restore(CURRENT.with(|current| current.replace(Some(id))));
    f()
}

/// A named serial queue backed by one worker thread.
///
/// Clones share the worker. It exits after the last clone is dropped and the
/// jobs already submitted have run.
///
/// ```
/// use promise_await::{current, Executor, Queue};
/// use std::sync::mpsc::channel;
///
/// let queue = Queue::new("io").expect("spawn queue");
/// let (tx, rx) = channel();
/// queue.submit(Box::new(move || tx.send(current()).unwrap()));
/// assert_eq!(rx.recv().unwrap(), Some(queue.id()));
/// ```
#[derive(Clone)]
pub struct Queue {
    inner: Arc<Inner>,
}

struct Inner {
    id: ExecutorId,
    label: String,
    sender: Sender<Job>,
}

impl Queue {
    pub fn new(label: impl Into<String>) -> io::Result<Self> {
        let label = label.into();
        let id = ExecutorId::next();
        let (sender, receiver) = channel();
        let name = label.clone();
        thread::Builder::new()
            .name(label.clone())
            .spawn(move || run(id, &name, receiver))?;
        Ok(Queue {
            inner: Arc::new(Inner { id, label, sender }),
        })
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn id(&self) -> ExecutorId {
        self.inner.id
    }
}

impl Executor for Queue {
    fn id(&self) -> ExecutorId {
        self.inner.id
    }

    fn submit(&self, job: Job) {
        if self.inner.sender.send(job).is_err() {
            tracing::trace!(queue = %self.inner.label, "worker gone, dropping job");
        }
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.inner.label)
            .field("id", &self.inner.id)
            .finish()
    }
}

fn run(id: ExecutorId, label: &str, jobs: Receiver<Job>) {
    tracing::debug!(queue = %label, %id, "queue started");
    enter(id, || {
        for job in jobs {
            // A panicking job drops whatever it captured; the queue keeps going.
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::debug!(queue = %label, "job panicked");
            }
        }
    });
    tracing::debug!(queue = %label, %id, "queue stopped");
}
