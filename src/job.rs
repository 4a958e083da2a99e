//! Job type and related definitions.
//!
//! A job is an opaque schedulable unit: a priority class and an entry point
//! that the executor runs exactly once. The executor never inspects the
//! payload; it treats the job as opaque except for priority and time
//! ordering.
//!
//! # Lifecycle
//!
//! 1. Job is created by a producer via [`Job::new`]
//! 2. Job is handed to the runtime (ownership transfers to the executor)
//! 3. If delayed or deadline-scheduled, the job waits in a timer structure
//! 4. A worker dequeues the job and calls [`Job::run`]
//! 5. The job is discarded once the entry point returns
//!
//! A job never skips the enqueued state, and no retry happens at this
//! layer; any retry policy belongs to the producer.

use crate::time::ClockKind;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global counter for generating unique job IDs.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Priority
// =============================================================================

/// Priority class for a job.
///
/// Classes are totally ordered: `Background < Utility < Default <
/// UserInitiated < UserInteractive`. Higher classes are serviced first,
/// with a bounded-unfairness guarantee so a continuous stream of
/// high-priority jobs cannot starve lower classes indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Maintenance work the user never waits on.
    Background,
    /// Work the user is not actively waiting on.
    Utility,
    /// The default class for jobs with no explicit priority.
    Default,
    /// Work the user asked for and is waiting on.
    UserInitiated,
    /// Work blocking direct user interaction.
    UserInteractive,
}

impl Priority {
    /// Number of priority classes.
    pub const COUNT: usize = 5;

    /// All classes, lowest first.
    pub const ALL: [Priority; Priority::COUNT] = [
        Priority::Background,
        Priority::Utility,
        Priority::Default,
        Priority::UserInitiated,
        Priority::UserInteractive,
    ];

    /// Returns the queue index for this class (0 = lowest).
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Background => "background",
            Priority::Utility => "utility",
            Priority::Default => "default",
            Priority::UserInitiated => "user_initiated",
            Priority::UserInteractive => "user_interactive",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Job ID
// =============================================================================

/// Unique identifier for a job, used for trace correlation.
///
/// IDs are generated from a process-wide monotonic counter when the job is
/// created. They carry no meaning beyond uniqueness within the process.
#[derive(Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Creates a fresh unique job ID.
    pub(crate) fn next() -> Self {
        Self(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// Scheduling metadata stamped onto a job by the runtime facade.
///
/// Fire times are resolved to the monotonic timeline at enqueue time, so
/// the "no earlier than" guarantee is anchored to the moment the producer
/// called the scheduling operation, even if a hook holds the job before
/// forwarding it.
#[derive(Clone, Copy, Debug)]
pub enum Schedule {
    /// Run as soon as a worker is free.
    Immediate,
    /// Run no earlier than `fire_at` (`enqueue time + delay`).
    After {
        /// Earliest permissible start.
        fire_at: Instant,
        /// The delay the producer requested, kept for tracing.
        delay: Duration,
    },
    /// Run within `[fire_at, fire_at + leeway]`, never before `fire_at`.
    At {
        /// Earliest permissible start.
        fire_at: Instant,
        /// Allowed lateness window for timer coalescing.
        leeway: Duration,
        /// The clock the producer specified the deadline on.
        clock: ClockKind,
    },
}

impl Schedule {
    /// Returns the earliest permissible start, or `None` for immediate jobs.
    pub fn fire_at(&self) -> Option<Instant> {
        match self {
            Schedule::Immediate => None,
            Schedule::After { fire_at, .. } | Schedule::At { fire_at, .. } => Some(*fire_at),
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// An opaque schedulable unit of work.
///
/// A job is constructed by a producer, handed to the runtime, and executed
/// exactly once by whichever thread the backing engine dispatches it to.
/// It is not mutated after enqueue except by the executing thread at run
/// time.
///
/// # Re-entrancy
///
/// The entry point may enqueue further jobs. It must not block the
/// executing worker waiting for another job to run on that same worker;
/// that is a documented deadlock hazard, not something this layer detects.
pub struct Job {
    id: JobId,
    priority: Priority,
    schedule: Schedule,
    entry: Box<dyn FnOnce() + Send + 'static>,
}

impl Job {
    /// Creates a job with the given priority and entry point.
    pub fn new(priority: Priority, entry: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: JobId::next(),
            priority,
            schedule: Schedule::Immediate,
            entry: Box::new(entry),
        }
    }

    /// Returns the job's unique identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Returns the job's priority class.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the scheduling metadata stamped by the runtime.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Stamps scheduling metadata onto the job before delegation.
    pub(crate) fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    /// Consumes the job and runs its entry point.
    ///
    /// Called exactly once, by the worker that dequeued the job.
    pub fn run(self) {
        (self.entry)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Background < Priority::Utility);
        assert!(Priority::Utility < Priority::Default);
        assert!(Priority::Default < Priority::UserInitiated);
        assert!(Priority::UserInitiated < Priority::UserInteractive);
    }

    #[test]
    fn test_priority_index() {
        assert_eq!(Priority::Background.index(), 0);
        assert_eq!(Priority::UserInteractive.index(), Priority::COUNT - 1);
        for (i, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::UserInitiated), "user_initiated");
        assert_eq!(format!("{}", Priority::Background), "background");
    }

    #[test]
    fn test_job_id_unique() {
        let a = Job::new(Priority::Default, || {});
        let b = Job::new(Priority::Default, || {});
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_job_run_invokes_entry() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let job = Job::new(Priority::Default, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        job.run();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_fire_at() {
        assert!(Schedule::Immediate.fire_at().is_none());

        let t = Instant::now();
        let s = Schedule::After {
            fire_at: t,
            delay: Duration::from_millis(5),
        };
        assert_eq!(s.fire_at(), Some(t));
    }

    #[test]
    fn test_job_debug_format() {
        let job = Job::new(Priority::Utility, || {});
        let debug = format!("{:?}", job);
        assert!(debug.contains("Utility"));
    }
}
