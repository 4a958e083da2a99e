//! Backing executor strategies.
//!
//! The runtime delegates every accepted job to exactly one backing engine,
//! selected when the runtime is built and fixed thereafter:
//!
//! - [`PoolExecutor`]: a bounded set of OS worker threads popping from
//!   per-priority FIFO queues, with a dedicated timer thread promoting
//!   delayed and deadline jobs when due. The production default.
//! - [`CooperativeExecutor`]: a single logical thread of control; jobs run
//!   when the embedder drives the loop. For single-threaded runtimes.
//! - [`MinimalExecutor`]: one thread per job, no pooling. For constrained
//!   environments without a richer threading facility.
//!
//! All engines uphold the same core guarantees: an accepted job executes
//! exactly once, and a job with a fire time never starts before it.

mod cooperative;
mod minimal;
mod pool;

pub use cooperative::CooperativeExecutor;
pub use minimal::MinimalExecutor;
pub use pool::PoolExecutor;

use crate::config::ExecutorConfig;
use crate::job::Job;
use std::sync::Arc;

/// The engine that actually runs jobs.
///
/// `submit` consumes the job's stamped [`Schedule`](crate::job::Schedule):
/// immediate jobs become runnable at once, delayed and deadline jobs wait
/// in the engine's timer structure until their fire time. Submission is
/// non-blocking; it publishes the job and returns without waiting for
/// execution, and it does not fail. Resource exhaustion degrades to
/// queueing for the next available worker.
pub trait BackingExecutor: Send + Sync {
    /// Accepts a job for eventual execution.
    fn submit(&self, job: Job);

    /// Runs pending work on the calling thread.
    ///
    /// Only meaningful for the cooperative engine, which has no threads of
    /// its own; the threaded engines make progress without being driven
    /// and implement this as a no-op.
    fn drive(&self) {}

    /// Stops the engine, draining already-runnable jobs and joining any
    /// owned threads. Jobs still waiting on a timer are discarded.
    fn shutdown(&self);
}

/// Builds the configured backing engine.
pub fn build(config: &ExecutorConfig) -> Arc<dyn BackingExecutor> {
    match config.backing {
        crate::config::BackingKind::Cooperative => Arc::new(CooperativeExecutor::new()),
        crate::config::BackingKind::Pool => Arc::new(PoolExecutor::new(config.worker_threads)),
        crate::config::BackingKind::Minimal => Arc::new(MinimalExecutor::new()),
    }
}
