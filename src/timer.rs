//! Time-ordered holding structure for delayed and deadline jobs.
//!
//! Delayed and deadline jobs wait in a min-heap keyed by fire time until
//! they become due, then get promoted into the immediate run queues. The
//! pool engine services the heap from a dedicated timer thread; the
//! cooperative engine promotes due entries inline from its drive loop.

use crate::job::Job;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

/// A job waiting for its fire time.
struct TimerEntry {
    fire_at: Instant,
    /// Monotonic sequence so entries with equal fire times pop FIFO.
    seq: u64,
    job: Job,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of jobs keyed by fire time.
///
/// Not internally synchronized; callers wrap this in a lock and pair
/// pushes with a wakeup of whatever services the heap.
pub struct TimerHeap {
    entries: BinaryHeap<Reverse<TimerEntry>>,
    next_seq: u64,
}

impl TimerHeap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Adds a job to fire no earlier than `fire_at`.
    pub fn push(&mut self, fire_at: Instant, job: Job) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Reverse(TimerEntry { fire_at, seq, job }));
    }

    /// Returns the earliest pending fire time, if any.
    pub fn next_fire(&self) -> Option<Instant> {
        self.entries.peek().map(|Reverse(e)| e.fire_at)
    }

    /// Removes and returns every entry due at or before `now`.
    ///
    /// Entries with equal fire times come out in push order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Job> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.entries.peek() {
            if entry.fire_at > now {
                break;
            }
            let Some(Reverse(entry)) = self.entries.pop() else {
                break;
            };
            due.push(entry.job);
        }
        due
    }

    /// Discards every pending entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TimerHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimerHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHeap")
            .field("pending", &self.entries.len())
            .field("next_fire", &self.next_fire())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Priority;
    use std::time::Duration;

    fn job() -> Job {
        Job::new(Priority::Default, || {})
    }

    #[test]
    fn test_empty_heap() {
        let mut heap = TimerHeap::new();
        assert!(heap.is_empty());
        assert!(heap.next_fire().is_none());
        assert!(heap.pop_due(Instant::now()).is_empty());
    }

    #[test]
    fn test_earliest_fire_time_wins() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();

        let late = job();
        let early = job();
        let early_id = early.id();

        heap.push(now + Duration::from_secs(10), late);
        heap.push(now + Duration::from_secs(1), early);

        assert_eq!(heap.next_fire(), Some(now + Duration::from_secs(1)));

        let due = heap.pop_due(now + Duration::from_secs(5));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), early_id);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_not_due_stays_pending() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.push(now + Duration::from_secs(60), job());

        assert!(heap.pop_due(now).is_empty());
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_equal_fire_times_pop_fifo() {
        let mut heap = TimerHeap::new();
        let fire = Instant::now() + Duration::from_millis(1);

        let jobs: Vec<_> = (0..5).map(|_| job()).collect();
        let ids: Vec<_> = jobs.iter().map(|j| j.id()).collect();
        for j in jobs {
            heap.push(fire, j);
        }

        let due = heap.pop_due(fire);
        let popped: Vec<_> = due.iter().map(|j| j.id()).collect();
        assert_eq!(popped, ids);
    }

    #[test]
    fn test_pop_due_drains_all_due() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        for i in 0..4 {
            heap.push(now + Duration::from_millis(i), job());
        }
        heap.push(now + Duration::from_secs(30), job());

        let due = heap.pop_due(now + Duration::from_millis(10));
        assert_eq!(due.len(), 4);
        assert_eq!(heap.len(), 1);
    }
}
