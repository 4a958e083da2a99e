//! Clock selection and deadline resolution.
//!
//! Deadline-based scheduling names a point on one of two clocks: the
//! monotonic suspending clock or the wall clock. Engines work exclusively
//! on the monotonic timeline, so wall-clock deadlines are converted at
//! enqueue time. The conversion is approximate in the same way any
//! `SystemTime` to `Instant` mapping is: elapsed time between the two
//! `now` readings is folded into the leeway the producer already granted.

use std::time::{Duration, Instant, SystemTime};

/// Raw value for the monotonic clock, as accepted by [`ClockKind::from_raw`].
pub const CLOCK_MONOTONIC_RAW: i32 = 1;

/// Raw value for the wall clock, as accepted by [`ClockKind::from_raw`].
pub const CLOCK_WALL_RAW: i32 = 2;

/// Which clock a deadline is specified on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockKind {
    /// The process-local monotonic clock.
    Monotonic,
    /// The calendar wall clock.
    Wall,
}

impl ClockKind {
    /// Converts a raw clock selector into a [`ClockKind`].
    ///
    /// # Panics
    ///
    /// Panics on an unknown selector. An invalid clock kind is a
    /// programmer error at the call site, not a runtime condition the
    /// executor can recover from.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            CLOCK_MONOTONIC_RAW => ClockKind::Monotonic,
            CLOCK_WALL_RAW => ClockKind::Wall,
            other => panic!("invalid clock kind {other} (expected 1=monotonic or 2=wall)"),
        }
    }
}

/// A point in time on a selected clock.
///
/// Producers build one of these for
/// [`enqueue_at`](crate::Runtime::enqueue_at); the runtime resolves it to
/// the monotonic timeline before handing the job to the backing engine.
#[derive(Clone, Copy, Debug)]
pub enum Deadline {
    /// A point on the monotonic clock.
    Monotonic(Instant),
    /// A point on the wall clock.
    Wall(SystemTime),
}

impl Deadline {
    /// Returns the clock this deadline is specified on.
    pub fn clock(&self) -> ClockKind {
        match self {
            Deadline::Monotonic(_) => ClockKind::Monotonic,
            Deadline::Wall(_) => ClockKind::Wall,
        }
    }

    /// Resolves the deadline to the monotonic timeline.
    ///
    /// A wall-clock target already in the past resolves to now, so the job
    /// fires immediately. A monotonic target is returned as-is.
    pub fn resolve(&self) -> Instant {
        match self {
            Deadline::Monotonic(instant) => *instant,
            Deadline::Wall(target) => {
                let now_system = SystemTime::now();
                let now_instant = Instant::now();
                match target.duration_since(now_system) {
                    Ok(remaining) => now_instant + remaining,
                    // Target is in the past.
                    Err(_) => now_instant,
                }
            }
        }
    }
}

/// Sleeps the calling thread until `deadline` on the monotonic clock.
///
/// Loops on the remaining duration so spurious early wakeups cannot cause
/// an early firing.
pub(crate) fn sleep_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(deadline - now);
    }
}

/// Builds a `Duration` from whole seconds plus nanoseconds.
pub fn duration_from_parts(secs: u64, nanos: u32) -> Duration {
    Duration::new(secs, nanos)
}
