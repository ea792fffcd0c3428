//! Fixed-size worker pool over a shared FIFO task queue
//!
//! Workers block on a condvar while idle and pull one task at a time. The
//! queue tracks a pending-task counter so callers can wait for all work,
//! including work submitted recursively from inside running tasks, without
//! knowing the total task count upfront.
//!
//! Based on the Goetz work-queue design: one mutex guards the task list and
//! the pending counter, with separate condvars for "work available" (wakes
//! workers) and "all pending done" (wakes drain waiters).

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// The default number of worker threads when none is specified.
pub const DEFAULT_THREADS: usize = 5;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// State guarded by the queue mutex.
struct QueueState {
    /// Pending work in FIFO order.
    tasks: VecDeque<Task>,

    /// Submitted-but-not-finished task count. Incremented on submit,
    /// decremented when a task completes (successfully or not).
    pending: usize,

    /// Once set, idle workers exit when the task list is empty.
    shutdown: bool,
}

/// Shared core of the queue, held by the pool and by task handles.
struct Inner {
    state: Mutex<QueueState>,
    work_available: Condvar,
    all_done: Condvar,

    /// Panic messages captured from failed tasks.
    failures: Mutex<Vec<String>>,
}

/// A fixed pool of worker threads consuming a shared FIFO task queue.
///
/// `execute` never blocks the caller; `finish` waits for the pending count
/// to reach zero while leaving the pool usable; `join` drains, shuts down,
/// and waits for every worker thread to terminate.
pub struct WorkQueue {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

/// A cloneable submit-only handle, used by tasks that enqueue more tasks
/// into the pool they are running on.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<Inner>,
}

impl Inner {
    fn execute(&self, task: Task) {
        let mut state = self.state.lock().unwrap();
        if state.shutdown {
            tracing::warn!("Task submitted after shutdown was requested; dropping");
            return;
        }
        state.pending += 1;
        state.tasks.push_back(task);
        drop(state);
        self.work_available.notify_one();
    }

    /// Runs dequeued tasks until shutdown is requested and the queue drains.
    fn worker_loop(&self) {
        loop {
            let task = {
                let mut state = self.state.lock().unwrap();
                while state.tasks.is_empty() && !state.shutdown {
                    tracing::trace!("Worker waiting for work");
                    state = self.work_available.wait(state).unwrap();
                }
                match state.tasks.pop_front() {
                    Some(task) => task,
                    // Shutdown with an empty queue: terminate.
                    None => break,
                }
            };

            // Run outside the queue lock. A panicking task must not take
            // the worker thread down with it.
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            if let Err(payload) = outcome {
                let message = panic_message(payload);
                tracing::error!("Task failed: {}", message);
                self.failures.lock().unwrap().push(message);
            }

            let mut state = self.state.lock().unwrap();
            state.pending -= 1;
            if state.pending == 0 {
                self.all_done.notify_all();
            }
        }
        tracing::debug!("Worker thread terminating");
    }
}

impl WorkQueue {
    /// Starts a work queue with the default number of worker threads.
    pub fn new() -> Self {
        Self::with_threads(DEFAULT_THREADS)
    }

    /// Starts a work queue with `threads` worker threads. Requests below 1
    /// fall back to the default pool size.
    pub fn with_threads(threads: usize) -> Self {
        let threads = if threads < 1 { DEFAULT_THREADS } else { threads };
        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                pending: 0,
                shutdown: false,
            }),
            work_available: Condvar::new(),
            all_done: Condvar::new(),
            failures: Mutex::new(Vec::new()),
        });

        let workers = (0..threads)
            .map(|i| {
                let inner = Arc::clone(&inner);
                std::thread::Builder::new()
                    .name(format!("spindex-worker-{}", i))
                    .spawn(move || inner.worker_loop())
                    .expect("failed to spawn worker thread")
            })
            .collect();

        tracing::debug!("Work queue initialized with {} worker threads", threads);
        Self { inner, workers }
    }

    /// Enqueues a task; a worker thread will run it when available.
    /// Returns immediately.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute(Box::new(task));
    }

    /// Returns a submit-only handle for tasks that schedule more tasks.
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Blocks the calling thread until every pending task has finished,
    /// including tasks submitted while waiting. Workers stay alive, so the
    /// queue remains usable afterwards.
    pub fn finish(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while state.pending > 0 {
            state = self.inner.all_done.wait(state).unwrap();
        }
    }

    /// Signals workers to exit once the queue is empty. In-flight tasks are
    /// not interrupted; no new work is accepted.
    pub fn shutdown(&self) {
        tracing::debug!("Work queue shutting down");
        let mut state = self.inner.state.lock().unwrap();
        state.shutdown = true;
        drop(state);
        self.inner.work_available.notify_all();
    }

    /// Waits for all work to finish, shuts down, and joins every worker
    /// thread. The queue cannot be reused afterwards.
    pub fn join(mut self) {
        self.finish();
        self.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked outside a task");
            }
        }
        tracing::debug!("All worker threads terminated");
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Returns the number of submitted-but-unfinished tasks.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().unwrap().pending
    }

    /// Drains and returns the panic messages captured from failed tasks.
    pub fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.failures.lock().unwrap())
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskHandle {
    /// Enqueues a task from inside another task.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute(Box::new(task));
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("task panicked with a non-string payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_pending_zero_after_finish() {
        let queue = WorkQueue::with_threads(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            queue.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.finish();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(queue.pending(), 0);
        queue.join();
    }

    #[test]
    fn test_finish_with_no_work() {
        let queue = WorkQueue::with_threads(2);
        queue.finish();
        assert_eq!(queue.pending(), 0);
        queue.join();
    }

    #[test]
    fn test_queue_reusable_after_finish() {
        let queue = WorkQueue::with_threads(2);
        let counter = Arc::new(AtomicUsize::new(0));

        for round in 0..3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                queue.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            queue.finish();
            assert_eq!(counter.load(Ordering::SeqCst), (round + 1) * 10);
        }

        queue.join();
    }

    #[test]
    fn test_recursive_submission_counted() {
        let queue = WorkQueue::with_threads(3);
        let counter = Arc::new(AtomicUsize::new(0));

        // Each task spawns children until depth runs out; total task count
        // is unknown to the drain-waiter upfront.
        fn spawn(handle: TaskHandle, depth: usize, counter: Arc<AtomicUsize>) {
            counter.fetch_add(1, Ordering::SeqCst);
            if depth > 0 {
                for _ in 0..2 {
                    let handle_clone = handle.clone();
                    let counter = Arc::clone(&counter);
                    handle.execute(move || spawn(handle_clone, depth - 1, counter));
                }
            }
        }

        let handle = queue.handle();
        let root_handle = handle.clone();
        let root_counter = Arc::clone(&counter);
        queue.execute(move || spawn(root_handle, 4, root_counter));

        queue.finish();
        // 1 + 2 + 4 + 8 + 16 = 31 tasks.
        assert_eq!(counter.load(Ordering::SeqCst), 31);
        assert_eq!(queue.pending(), 0);
        queue.join();
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let queue = WorkQueue::with_threads(1);
        let counter = Arc::new(AtomicUsize::new(0));

        queue.execute(|| panic!("boom"));
        let after = Arc::clone(&counter);
        queue.execute(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });

        queue.finish();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let failures = queue.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("boom"));
        queue.join();
    }

    #[test]
    fn test_shutdown_stops_idle_workers() {
        let queue = WorkQueue::with_threads(2);
        queue.execute(|| std::thread::sleep(Duration::from_millis(20)));
        queue.join();
    }

    #[test]
    fn test_zero_threads_falls_back_to_default() {
        let queue = WorkQueue::with_threads(0);
        assert_eq!(queue.size(), DEFAULT_THREADS);
        queue.join();
    }
}
