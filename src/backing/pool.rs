//! Thread-pool-backed engine.
//!
//! A bounded set of OS worker threads pops from the per-priority run
//! queues; idle workers sleep on a condvar and are woken on enqueue, never
//! busy-polling. Delayed and deadline jobs wait in a min-heap serviced by
//! a dedicated timer thread that re-injects them into the run queues when
//! due, so workers only ever see runnable jobs.

use super::BackingExecutor;
use crate::job::{Job, Schedule};
use crate::queue::ClassQueues;
use crate::timer::TimerHeap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

struct PoolShared {
    ready: Mutex<ClassQueues>,
    work_available: Condvar,
    shutdown: AtomicBool,
}

impl PoolShared {
    /// Publishes a runnable job and wakes one sleeping worker.
    fn inject(&self, job: Job) {
        self.ready.lock().push(job);
        self.work_available.notify_one();
    }
}

struct TimerShared {
    heap: Mutex<TimerHeap>,
    timer_wake: Condvar,
    shutdown: AtomicBool,
}

/// OS-thread-pool engine with a dedicated timer thread.
pub struct PoolExecutor {
    shared: Arc<PoolShared>,
    timers: Arc<TimerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl PoolExecutor {
    /// Spawns `worker_threads` workers and the timer thread.
    ///
    /// A worker that fails to spawn is skipped rather than failing the
    /// construction; the remaining workers absorb the load. At least the
    /// queues themselves always exist, so enqueue never fails.
    pub fn new(worker_threads: usize) -> Self {
        let worker_threads = worker_threads.max(1);

        let shared = Arc::new(PoolShared {
            ready: Mutex::new(ClassQueues::new()),
            work_available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let timers = Arc::new(TimerShared {
            heap: Mutex::new(TimerHeap::new()),
            timer_wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(worker_threads);
        for worker_id in 0..worker_threads {
            let worker_shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("conveyor-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_shared, worker_id));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    tracing::warn!(worker_id, %error, "Failed to spawn pool worker");
                }
            }
        }

        let timer_shared = Arc::clone(&timers);
        let timer_inject = Arc::clone(&shared);
        let timer_thread = std::thread::Builder::new()
            .name("conveyor-timer".to_string())
            .spawn(move || timer_loop(timer_shared, timer_inject))
            .map_err(|error| {
                tracing::warn!(%error, "Failed to spawn timer thread");
            })
            .ok();

        tracing::debug!(
            workers = workers.len(),
            "Pool executor started"
        );

        Self {
            shared,
            timers,
            workers: Mutex::new(workers),
            timer_thread: Mutex::new(timer_thread),
        }
    }

    /// Holds a job in the timer heap until `fire_at`.
    fn hold_until(&self, fire_at: Instant, job: Job) {
        self.timers.heap.lock().push(fire_at, job);
        self.timers.timer_wake.notify_one();
    }
}

impl BackingExecutor for PoolExecutor {
    fn submit(&self, job: Job) {
        match *job.schedule() {
            Schedule::Immediate => self.shared.inject(job),
            Schedule::After { fire_at, .. } | Schedule::At { fire_at, .. } => {
                if fire_at <= Instant::now() {
                    self.shared.inject(job);
                } else {
                    self.hold_until(fire_at, job);
                }
            }
        }
    }

    fn shutdown(&self) {
        // Timer first so it stops injecting; its not-yet-due entries are
        // discarded.
        {
            let _heap = self.timers.heap.lock();
            self.timers.shutdown.store(true, Ordering::Release);
            self.timers.timer_wake.notify_all();
        }
        if let Some(handle) = self.timer_thread.lock().take() {
            let _ = handle.join();
        }

        // Workers drain the run queues before exiting.
        {
            let _ready = self.shared.ready.lock();
            self.shared.shutdown.store(true, Ordering::Release);
            self.shared.work_available.notify_all();
        }
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }

        tracing::debug!("Pool executor stopped");
    }
}

impl std::fmt::Debug for PoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolExecutor")
            .field("workers", &self.workers.lock().len())
            .field("queued", &self.shared.ready.lock().len())
            .field("pending_timers", &self.timers.heap.lock().len())
            .finish()
    }
}

/// Worker loop: pop runnable jobs, sleep when idle, drain on shutdown.
fn worker_loop(shared: Arc<PoolShared>, worker_id: usize) {
    tracing::trace!(worker_id, "Worker started");
    loop {
        let job = {
            let mut ready = shared.ready.lock();
            loop {
                if let Some(job) = ready.pop() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                shared.work_available.wait(&mut ready);
            }
        };

        match job {
            Some(job) => {
                tracing::trace!(worker_id, job_id = %job.id(), "Running job");
                job.run();
            }
            None => break,
        }
    }
    tracing::trace!(worker_id, "Worker stopped");
}

/// Timer loop: sleep until the earliest fire time, then re-inject every
/// due job into the run queues.
fn timer_loop(timers: Arc<TimerShared>, shared: Arc<PoolShared>) {
    loop {
        let due = {
            let mut heap = timers.heap.lock();
            loop {
                if timers.shutdown.load(Ordering::Acquire) {
                    return;
                }
                let due = heap.pop_due(Instant::now());
                if !due.is_empty() {
                    break due;
                }
                match heap.next_fire() {
                    Some(fire_at) => {
                        timers.timer_wake.wait_until(&mut heap, fire_at);
                    }
                    None => timers.timer_wake.wait(&mut heap),
                }
            }
        };

        // Inject outside the heap lock; a promoted job's thread may
        // immediately enqueue more timers.
        for job in due {
            shared.inject(job);
        }
    }
}
