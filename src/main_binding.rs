//! The main executor binding.
//!
//! One logical "main" executor can be bound per runtime: an identity token
//! paired with a serial implementation, written together as a matched pair
//! by a privileged setup call and read by any thread. Readers never see a
//! torn pair; the slot lock publishes both fields together.
//!
//! The main executor is always exclusive regardless of which backing
//! strategy is active: jobs enqueued on main run strictly in enqueue order
//! and never concurrently with one another.

use crate::identity::ExecutorId;
use crate::job::Job;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

// =============================================================================
// Main Runner
// =============================================================================

/// A serial implementation backing the main executor.
///
/// Implementations must run jobs strictly in the order they were enqueued,
/// one at a time. [`SerialMainRunner`] is the stock implementation; the
/// cooperative engine can serve as one too since it runs everything on a
/// single logical thread.
pub trait MainRunner: Send + Sync {
    /// Appends a job to the main queue. Non-blocking; the job runs later,
    /// after every job enqueued before it has completed.
    fn enqueue_main(&self, job: Job);

    /// Stops the runner after draining already-enqueued jobs.
    fn shutdown(&self) {}
}

// =============================================================================
// Main Binding
// =============================================================================

struct BoundMain {
    identity: ExecutorId,
    runner: Arc<dyn MainRunner>,
}

/// The (identity, implementation) pair for the bound main executor.
pub struct MainBinding {
    slot: RwLock<Option<BoundMain>>,
}

impl MainBinding {
    /// Creates an unbound slot.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Binds the main executor. Privileged; expected to be called at most
    /// once during startup, before any main enqueue. Rebinding through
    /// this same path replaces the pair atomically.
    pub fn bind(&self, identity: ExecutorId, runner: Arc<dyn MainRunner>) {
        *self.slot.write() = Some(BoundMain { identity, runner });
    }

    /// Clears the binding. Privileged; for teardown in tests.
    pub fn reset(&self) {
        *self.slot.write() = None;
    }

    /// Returns true if `identity` is the bound main executor. Returns
    /// false, not an error, when nothing is bound.
    pub fn is_main_executor(&self, identity: ExecutorId) -> bool {
        match self.slot.read().as_ref() {
            Some(bound) => bound.identity == identity,
            None => false,
        }
    }

    /// Returns the bound identity, or the generic sentinel when unbound.
    pub fn current(&self) -> ExecutorId {
        match self.slot.read().as_ref() {
            Some(bound) => bound.identity,
            None => ExecutorId::generic(),
        }
    }

    /// Returns the bound runner, if any.
    pub fn runner(&self) -> Option<Arc<dyn MainRunner>> {
        self.slot.read().as_ref().map(|b| Arc::clone(&b.runner))
    }
}

impl Default for MainBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MainBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainBinding")
            .field("bound", &self.slot.read().is_some())
            .field("identity", &self.current())
            .finish()
    }
}

// =============================================================================
// Serial Main Runner
// =============================================================================

struct SerialState {
    queue: Mutex<VecDeque<Job>>,
    work_available: Condvar,
    shutdown: AtomicBool,
}

/// Stock main-executor implementation: a dedicated thread draining a
/// strict FIFO queue, one job at a time.
pub struct SerialMainRunner {
    state: Arc<SerialState>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SerialMainRunner {
    /// Spawns the runner thread.
    pub fn new() -> Self {
        let state = Arc::new(SerialState {
            queue: Mutex::new(VecDeque::new()),
            work_available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let thread_state = Arc::clone(&state);
        let thread = std::thread::Builder::new()
            .name("conveyor-main".to_string())
            .spawn(move || Self::run_loop(thread_state))
            .ok();

        if thread.is_none() {
            tracing::error!("Failed to spawn main runner thread");
        }

        Self {
            state,
            thread: Mutex::new(thread),
        }
    }

    /// Builds a runner whose thread never started, as after a failed
    /// spawn.
    #[cfg(test)]
    fn without_thread() -> Self {
        Self {
            state: Arc::new(SerialState {
                queue: Mutex::new(VecDeque::new()),
                work_available: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
            thread: Mutex::new(None),
        }
    }

    fn run_loop(state: Arc<SerialState>) {
        loop {
            let job = {
                let mut queue = state.queue.lock();
                loop {
                    if let Some(job) = queue.pop_front() {
                        break Some(job);
                    }
                    // Drain before exit so shutdown never drops queued jobs.
                    if state.shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    state.work_available.wait(&mut queue);
                }
            };

            match job {
                Some(job) => job.run(),
                None => break,
            }
        }
    }

    /// Waits for queued jobs to drain, then stops the runner thread.
    pub fn join(&self) {
        {
            // Flag is set under the queue lock so a waiter between its
            // shutdown check and its wait cannot miss the wakeup.
            let _queue = self.state.queue.lock();
            self.state.shutdown.store(true, Ordering::Release);
            self.state.work_available.notify_all();
        }
        match self.thread.lock().take() {
            Some(handle) => {
                let _ = handle.join();
            }
            // No runner thread ever started: drain inline on the calling
            // thread so queued jobs still run exactly once, in order.
            None => Self::run_loop(Arc::clone(&self.state)),
        }
    }
}

impl Default for SerialMainRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MainRunner for SerialMainRunner {
    fn enqueue_main(&self, job: Job) {
        self.state.queue.lock().push_back(job);
        self.state.work_available.notify_one();
    }

    fn shutdown(&self) {
        self.join();
    }
}

impl std::fmt::Debug for SerialMainRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialMainRunner")
            .field("queued", &self.state.queue.lock().len())
            .finish()
    }
}
