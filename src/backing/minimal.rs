//! Minimal non-pooled fallback engine.
//!
//! For constrained environments without a richer pooling facility: every
//! submitted job gets its own OS thread, and a delayed or deadline job
//! simply sleeps on that thread until its fire time. No queues means no
//! cross-job fairness beyond what the OS scheduler provides; the engine
//! still guarantees no early firing and exactly-once eventual execution.

use super::BackingExecutor;
use crate::job::{Job, Schedule};
use crate::time::sleep_until;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Tracks in-flight job threads so shutdown can wait for them.
struct InFlight {
    count: Mutex<usize>,
    all_done: Condvar,
}

impl InFlight {
    fn enter(&self) {
        *self.count.lock() += 1;
    }

    fn exit(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.all_done.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.all_done.wait(&mut count);
        }
    }
}

/// Thread-per-job fallback engine.
pub struct MinimalExecutor {
    in_flight: Arc<InFlight>,
}

impl MinimalExecutor {
    /// Creates the engine. No threads exist until a job is submitted.
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(InFlight {
                count: Mutex::new(0),
                all_done: Condvar::new(),
            }),
        }
    }
}

impl Default for MinimalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingExecutor for MinimalExecutor {
    fn submit(&self, job: Job) {
        let fire_at = job.schedule().fire_at();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.enter();

        // The job sits in a shared slot so a failed spawn can reclaim it.
        let slot = Arc::new(Mutex::new(Some(job)));
        let thread_slot = Arc::clone(&slot);

        let spawned = std::thread::Builder::new()
            .name("conveyor-job".to_string())
            .spawn(move || {
                if let Some(fire_at) = fire_at {
                    sleep_until(fire_at);
                }
                if let Some(job) = thread_slot.lock().take() {
                    job.run();
                }
                in_flight.exit();
            });

        if let Err(error) = spawned {
            // Degrade to running inline on the caller's thread rather
            // than losing the job. The enqueue is no longer non-blocking,
            // but the exactly-once guarantee survives thread exhaustion.
            tracing::warn!(%error, "Failed to spawn job thread, running inline");
            if let Some(fire_at) = fire_at {
                sleep_until(fire_at);
            }
            if let Some(job) = slot.lock().take() {
                job.run();
            }
            self.in_flight.exit();
        }
    }

    fn shutdown(&self) {
        self.in_flight.wait_idle();
    }
}

impl std::fmt::Debug for MinimalExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinimalExecutor")
            .field("in_flight", &*self.in_flight.count.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_every_job_runs_once() {
        let minimal = MinimalExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let c = Arc::clone(&counter);
            minimal.submit(Job::new(Priority::Default, move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }

        minimal.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_delayed_job_sleeps_on_own_thread() {
        let minimal = MinimalExecutor::new();
        let started_at = Arc::new(Mutex::new(None));

        let delay = Duration::from_millis(40);
        let enqueued_at = Instant::now();
        let mut job = Job::new(Priority::Default, {
            let started_at = Arc::clone(&started_at);
            move || {
                *started_at.lock() = Some(Instant::now());
            }
        });
        job.set_schedule(Schedule::After {
            fire_at: enqueued_at + delay,
            delay,
        });
        minimal.submit(job);

        minimal.shutdown();
        let started = started_at.lock().expect("job never ran");
        assert!(started >= enqueued_at + delay);
    }

    #[test]
    fn test_shutdown_with_no_jobs() {
        let minimal = MinimalExecutor::new();
        minimal.shutdown();
    }
}
