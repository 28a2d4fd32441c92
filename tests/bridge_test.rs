#[cfg(test)]
mod tests {
    use promise_await::{
        await_body, await_fallible, await_infallible, current, guarantee, pair::Producer, Error,
        Promise, Queue,
    };
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    #[derive(Debug, PartialEq, Eq)]
    struct DiskFull {
        device: &'static str,
    }

    #[test]
    fn test_await_body_from_another_queue() {
        let main = Queue::new("main").unwrap();
        let background = Queue::new("background").unwrap();
        let handle = guarantee::spawn(&main, move || await_body(&background, || Ok::<_, ()>(42)));
        assert_eq!(await_infallible(handle, &main), Ok(Ok(42)));
    }

    #[test]
    fn test_await_body_on_its_own_queue() {
        let background = Queue::new("background").unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let (queue, body_ran) = (background.clone(), ran.clone());
        let handle = guarantee::spawn(&background, move || {
            await_body(&queue, move || {
                body_ran.store(true, Ordering::SeqCst);
                Ok::<_, ()>(42)
            })
        });
        let result = await_infallible(handle, &Queue::new("observer").unwrap());
        assert_eq!(result, Ok(Err(Error::SameQueue(background.id()))));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_await_body_failure_is_preserved() {
        let background = Queue::new("background").unwrap();
        let result = await_body(&background, || Err::<(), _>(DiskFull { device: "sda" }));
        assert_eq!(result, Err(Error::Failed(DiskFull { device: "sda" })));
    }

    #[test]
    fn test_pre_failed_handle() {
        let queue = Queue::new("io").unwrap();
        let (op, op_a) = Producer::<u32, &'static str>::new();
        op.reject("disk full");
        let result = await_fallible(op_a, &queue);
        assert_eq!(result, Err(Error::Failed("disk full")));
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(err.into_failure(), Some("disk full"));
    }

    #[test]
    fn test_fallible_value_from_another_thread() {
        let queue = Queue::new("io").unwrap();
        let (op, op_a) = Producer::<String, DiskFull>::new();
        let task = thread::spawn(move || op.resolve(String::from("🍓")));
        assert_eq!(await_fallible(op_a, &queue), Ok(String::from("🍓")));
        task.join().expect("The resolving thread has panicked");
    }

    #[test]
    fn test_caller_blocks_until_settled() {
        let queue = Queue::new("slow").unwrap();
        let (op, op_a) = Producer::<&'static str, ()>::new();
        let delay = Duration::from_millis(200);
        let start = Instant::now();
        let task = thread::spawn(move || {
            thread::sleep(delay);
            op.reject(());
        });
        assert_eq!(await_fallible(op_a, &queue), Err(Error::Failed(())));
        assert!(start.elapsed() >= delay);
        task.join().expect("The rejecting thread has panicked");
    }

    #[test]
    fn test_abandoned_handle_wakes_caller() {
        let queue = Queue::new("abandon").unwrap();
        let (op, op_a) = guarantee::Producer::<u8>::new();
        let task = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(op);
        });
        assert_eq!(await_infallible(op_a, &queue), Err(Error::Abandoned));
        task.join().expect("The dropping thread has panicked");
    }

    #[test]
    fn test_panicking_body_is_abandoned() {
        let queue = Queue::new("panicky").unwrap();
        let result = await_body(&queue, || -> Result<(), ()> { panic!("body failed") });
        assert_eq!(result, Err(Error::Abandoned));
        // The queue keeps serving.
        assert_eq!(await_body(&queue, || Ok::<_, ()>(current())), Ok(Some(queue.id())));
    }

    #[test]
    fn test_plain_thread_may_await() {
        let queue = Queue::new("plain").unwrap();
        assert_eq!(current(), None);
        let value = await_infallible(guarantee::spawn(&queue, || 1 + 1), &queue);
        assert_eq!(value, Ok(2));
    }

    #[test]
    fn test_same_queue_message() {
        let queue = Queue::new("main").unwrap();
        let err = promise_await::enter(queue.id(), || {
            await_body(&queue, || Ok::<_, String>(()))
        })
        .unwrap_err();
        assert!(err.is_same_queue());
        assert!(err.to_string().starts_with("operation aborted: same queue"));
    }
}
