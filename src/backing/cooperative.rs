//! Cooperative single-threaded engine.
//!
//! No threads are owned by this engine: jobs accumulate in the run queues
//! (and the timer heap, for delayed work) until the embedder drives the
//! loop, which then pops and runs jobs on the calling thread with no real
//! parallelism. Driving promotes due timers first, runs everything
//! runnable, and sleeps until the next fire time while timers remain, so
//! one `drive` call fully drains the engine.
//!
//! Jobs may re-enter the engine while running; the drive loop releases the
//! queue lock around every entry point invocation, and newly enqueued jobs
//! are picked up by the same drive pass.

use super::BackingExecutor;
use crate::job::{Job, Schedule};
use crate::queue::ClassQueues;
use crate::timer::TimerHeap;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

struct CoopState {
    ready: ClassQueues,
    timers: TimerHeap,
}

/// Single-threaded run-loop engine.
pub struct CooperativeExecutor {
    state: Mutex<CoopState>,
    /// Wakes a sleeping drive pass when new work arrives.
    work_available: Condvar,
    /// Serializes concurrent `drive` calls; the engine is one logical
    /// thread of control even if the embedder misuses it.
    driving: Mutex<()>,
}

impl CooperativeExecutor {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoopState {
                ready: ClassQueues::new(),
                timers: TimerHeap::new(),
            }),
            work_available: Condvar::new(),
            driving: Mutex::new(()),
        }
    }

    /// Returns the number of jobs currently runnable or waiting on a
    /// timer.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.ready.len() + state.timers.len()
    }

    /// Runs jobs on the calling thread until nothing is runnable.
    ///
    /// With `wait_for_timers`, sleeps until the next fire time while
    /// timers remain, so the pass fully drains the engine; without it,
    /// only already-due work runs.
    fn drain(&self, wait_for_timers: bool) {
        let _driver = self.driving.lock();
        loop {
            let job = {
                let mut state = self.state.lock();
                loop {
                    let now = Instant::now();
                    for due in state.timers.pop_due(now) {
                        state.ready.push(due);
                    }
                    if let Some(job) = state.ready.pop() {
                        break Some(job);
                    }
                    match state.timers.next_fire() {
                        Some(fire_at) if wait_for_timers => {
                            self.work_available.wait_until(&mut state, fire_at);
                        }
                        _ => break None,
                    }
                }
            };

            match job {
                // Run outside the lock: the job may enqueue more work.
                Some(job) => job.run(),
                None => break,
            }
        }
    }
}

impl Default for CooperativeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingExecutor for CooperativeExecutor {
    fn submit(&self, job: Job) {
        {
            let mut state = self.state.lock();
            match *job.schedule() {
                Schedule::Immediate => state.ready.push(job),
                Schedule::After { fire_at, .. } | Schedule::At { fire_at, .. } => {
                    if fire_at <= Instant::now() {
                        state.ready.push(job);
                    } else {
                        state.timers.push(fire_at, job);
                    }
                }
            }
        }
        self.work_available.notify_one();
    }

    fn drive(&self) {
        self.drain(true);
    }

    fn shutdown(&self) {
        // Run what is already due; not-yet-due timers are discarded. The
        // engine owns no threads to join.
        self.drain(false);
        self.state.lock().timers.clear();
    }
}

impl std::fmt::Debug for CooperativeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CooperativeExecutor")
            .field("ready", &state.ready.len())
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_jobs_wait_for_drive() {
        let coop = CooperativeExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        coop.submit(Job::new(Priority::Default, move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        coop.drive();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drive_respects_priority_then_fifo() {
        let coop = CooperativeExecutor::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, priority) in [
            ("a", Priority::Default),
            ("b", Priority::Background),
            ("c", Priority::UserInitiated),
            ("d", Priority::UserInitiated),
        ] {
            let order = Arc::clone(&order);
            coop.submit(Job::new(priority, move || {
                order.lock().push(label);
            }));
        }

        coop.drive();
        assert_eq!(*order.lock(), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_reentrant_enqueue_runs_same_drive() {
        let coop = Arc::new(CooperativeExecutor::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_coop = Arc::clone(&coop);
        let inner_counter = Arc::clone(&counter);
        coop.submit(Job::new(Priority::Default, move || {
            let c = Arc::clone(&inner_counter);
            inner_coop.submit(Job::new(Priority::Default, move || {
                c.fetch_add(10, Ordering::SeqCst);
            }));
            inner_counter.fetch_add(1, Ordering::SeqCst);
        }));

        coop.drive();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_drive_sleeps_until_timer_fires() {
        let coop = CooperativeExecutor::new();
        let ran_at = Arc::new(Mutex::new(None));

        let delay = Duration::from_millis(30);
        let enqueued_at = Instant::now();
        let mut job = Job::new(Priority::Default, {
            let ran_at = Arc::clone(&ran_at);
            move || {
                *ran_at.lock() = Some(Instant::now());
            }
        });
        job.set_schedule(Schedule::After {
            fire_at: enqueued_at + delay,
            delay,
        });
        coop.submit(job);

        coop.drive();
        let started = ran_at.lock().expect("job never ran");
        assert!(started >= enqueued_at + delay);
    }

    #[test]
    fn test_pending_counts_both_structures() {
        let coop = CooperativeExecutor::new();
        coop.submit(Job::new(Priority::Default, || {}));

        let mut delayed = Job::new(Priority::Default, || {});
        delayed.set_schedule(Schedule::After {
            fire_at: Instant::now() + Duration::from_secs(60),
            delay: Duration::from_secs(60),
        });
        coop.submit(delayed);

        assert_eq!(coop.pending(), 2);
    }
}
