//! Fixed-size worker pool
//!
//! `capacity` threads pull jobs from an unbounded queue. A pending-task count
//! guarded by a condvar acts as the wait group: the pool is drained only when
//! every submitted job has returned or panicked.
//!
//! ## Lifecycle
//!
//! - Running: `submit` enqueues jobs
//! - Draining: `shutdown_and_join` closes the queue, workers finish what is queued
//! - Terminated: every worker thread has been joined

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::utils::{HarnessError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outstanding work shared between the pool handle and its threads
struct PendingTasks {
    count: Mutex<usize>,
    drained: Condvar,
    failed: AtomicUsize,
}

impl PendingTasks {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            drained: Condvar::new(),
            failed: AtomicUsize::new(0),
        }
    }

    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn complete(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn current(&self) -> usize {
        *self.count.lock()
    }

    /// Block until no task is pending, or until `deadline`
    ///
    /// Returns the number of tasks still pending (0 on success).
    fn wait_until(&self, deadline: Option<Instant>) -> usize {
        let mut count = self.count.lock();
        while *count > 0 {
            match deadline {
                Some(deadline) => {
                    if self.drained.wait_until(&mut count, deadline).timed_out() {
                        break;
                    }
                }
                None => self.drained.wait(&mut count),
            }
        }
        *count
    }
}

/// Pool of OS threads that runs submitted jobs to completion
pub struct WorkerPool {
    capacity: usize,
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    pending: Arc<PendingTasks>,
}

impl WorkerPool {
    /// Spawn `capacity` worker threads
    ///
    /// A zero capacity is a configuration error. Failing to spawn any thread
    /// exhausts the pool; threads already started are shut down first.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HarnessError::Config(
                "pool capacity must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = unbounded::<Job>();
        let pending = Arc::new(PendingTasks::new());
        let mut handles = Vec::with_capacity(capacity);

        for index in 0..capacity {
            let receiver = receiver.clone();
            let pending = Arc::clone(&pending);

            let spawned = thread::Builder::new()
                .name(format!("race-worker-{}", index))
                .spawn(move || Self::worker_loop(receiver, pending));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(sender);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(HarnessError::PoolExhausted(format!(
                        "spawned {} of {} worker threads: {}",
                        index, capacity, e
                    )));
                }
            }
        }

        debug!("Worker pool started with {} threads", capacity);

        Ok(Self {
            capacity,
            sender: Some(sender),
            handles,
            pending,
        })
    }

    fn worker_loop(receiver: Receiver<Job>, pending: Arc<PendingTasks>) {
        for job in receiver.iter() {
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                pending.failed.fetch_add(1, Ordering::SeqCst);
            }
            pending.complete();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks submitted but not yet finished
    pub fn pending_tasks(&self) -> usize {
        self.pending.current()
    }

    /// Enqueue a job
    ///
    /// The job starts at or after this call on whichever worker is free first.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or_else(|| {
            HarnessError::PoolExhausted("pool is shut down, submission rejected".to_string())
        })?;

        self.pending.add();
        if sender.send(Box::new(job)).is_err() {
            self.pending.complete();
            return Err(HarnessError::PoolExhausted(
                "no worker thread left to receive the job".to_string(),
            ));
        }
        Ok(())
    }

    /// Close the queue and block until every submitted job has finished
    pub fn shutdown_and_join(self) -> Result<()> {
        self.drain(None)
    }

    /// Like [`shutdown_and_join`](Self::shutdown_and_join) but gives up after
    /// `timeout`
    ///
    /// On timeout the still-running threads are detached and the error names
    /// how many tasks never completed.
    pub fn shutdown_and_join_timeout(self, timeout: Duration) -> Result<()> {
        self.drain(Some(timeout))
    }

    fn drain(mut self, timeout: Option<Duration>) -> Result<()> {
        // Closing the sender ends each worker's receive loop once the queue is empty
        self.sender.take();

        let deadline = timeout.map(|t| Instant::now() + t);
        let remaining = self.pending.wait_until(deadline);
        if remaining > 0 {
            let timeout_ms = timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
            warn!(
                "Worker pool did not drain within {}ms ({} pending)",
                timeout_ms, remaining
            );
            // Dropping the handles detaches the threads so Drop does not block
            self.handles.clear();
            return Err(HarnessError::JoinTimeout {
                timeout_ms,
                pending: remaining,
            });
        }

        let mut panicked_threads = 0usize;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                panicked_threads += 1;
            }
        }

        let failed = self.pending.failed.load(Ordering::SeqCst) + panicked_threads;
        debug!("Worker pool drained ({} failed)", failed);

        if failed > 0 {
            return Err(HarnessError::TaskFailed { failed });
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Dropped without an explicit join: still wait, never leak running jobs
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
