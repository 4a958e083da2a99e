//! Per-priority run queues with bounded-unfairness servicing.
//!
//! Ready jobs live in one FIFO queue per priority class. Workers pop from
//! the highest non-empty class, but each class only gets a bounded burst
//! of consecutive pops while lower classes wait; when the burst is spent,
//! one slot is yielded to the next non-empty lower class. Higher classes
//! get larger bursts, so priority precedence holds while a continuous
//! stream of high-priority jobs cannot starve lower classes indefinitely.
//!
//! FIFO order within a class is preserved unconditionally: jobs of equal
//! priority enqueued by one thread are popped in enqueue order.

use crate::job::{Job, Priority};
use std::collections::VecDeque;

/// Consecutive pops a class may take while lower classes wait, indexed by
/// class (lowest first). Background has no class below it, so its weight
/// never comes into play.
pub const BURST_WEIGHTS: [u32; Priority::COUNT] = [1, 2, 4, 8, 16];

/// Priority-classed FIFO run queues.
///
/// Not internally synchronized; callers wrap this in a lock and pair pops
/// with their own wakeup signalling.
pub struct ClassQueues {
    queues: [VecDeque<Job>; Priority::COUNT],
    /// Consecutive pops taken by each class since it last yielded.
    burst_used: [u32; Priority::COUNT],
    len: usize,
}

impl ClassQueues {
    /// Creates empty queues.
    pub fn new() -> Self {
        Self {
            queues: Default::default(),
            burst_used: [0; Priority::COUNT],
            len: 0,
        }
    }

    /// Appends a job to its class queue.
    pub fn push(&mut self, job: Job) {
        self.queues[job.priority().index()].push_back(job);
        self.len += 1;
    }

    /// Pops the next job to run, or `None` if all queues are empty.
    pub fn pop(&mut self) -> Option<Job> {
        let top = self.highest_non_empty()?;

        // Yield one slot to the class below once the burst is spent.
        // Without a waiting lower class there is no starvation pressure,
        // so the burst restarts instead of carrying stale counts into the
        // next contended batch.
        if self.burst_used[top] >= BURST_WEIGHTS[top] {
            match self.highest_non_empty_below(top) {
                Some(lower) => {
                    self.burst_used[top] = 0;
                    return self.pop_from(lower);
                }
                None => self.burst_used[top] = 0,
            }
        }

        self.burst_used[top] += 1;
        self.pop_from(top)
    }

    /// Returns the total number of queued jobs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no jobs are queued.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn pop_from(&mut self, class: usize) -> Option<Job> {
        let job = self.queues[class].pop_front();
        if job.is_some() {
            self.len -= 1;
            // A drained queue set starts the next batch with fresh bursts.
            if self.len == 0 {
                self.burst_used = [0; Priority::COUNT];
            }
        }
        job
    }

    fn highest_non_empty(&self) -> Option<usize> {
        (0..Priority::COUNT).rev().find(|&i| !self.queues[i].is_empty())
    }

    fn highest_non_empty_below(&self, class: usize) -> Option<usize> {
        (0..class).rev().find(|&i| !self.queues[i].is_empty())
    }
}

impl Default for ClassQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassQueues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassQueues")
            .field("len", &self.len)
            .field("burst_used", &self.burst_used)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(priority: Priority) -> Job {
        Job::new(priority, || {})
    }

    #[test]
    fn test_empty_queues() {
        let mut q = ClassQueues::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_fifo_within_class() {
        let mut q = ClassQueues::new();
        let jobs: Vec<_> = (0..10).map(|_| job(Priority::Default)).collect();
        let ids: Vec<_> = jobs.iter().map(|j| j.id()).collect();
        for j in jobs {
            q.push(j);
        }

        let popped: Vec<_> = std::iter::from_fn(|| q.pop()).map(|j| j.id()).collect();
        assert_eq!(popped, ids);
    }

    #[test]
    fn test_priority_precedence() {
        let mut q = ClassQueues::new();
        let a = job(Priority::Default);
        let b = job(Priority::Background);
        let c = job(Priority::UserInitiated);
        let (ia, ib, ic) = (a.id(), b.id(), c.id());

        q.push(a);
        q.push(b);
        q.push(c);

        assert_eq!(q.pop().map(|j| j.id()), Some(ic));
        assert_eq!(q.pop().map(|j| j.id()), Some(ia));
        assert_eq!(q.pop().map(|j| j.id()), Some(ib));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_burst_yields_to_lower_class() {
        let mut q = ClassQueues::new();
        let low = job(Priority::Background);
        let low_id = low.id();
        q.push(low);

        // More high-priority jobs than the interactive burst weight.
        let burst = BURST_WEIGHTS[Priority::UserInteractive.index()] as usize;
        for _ in 0..(burst * 2) {
            q.push(job(Priority::UserInteractive));
        }

        // The background job must surface within burst + 1 pops.
        let mut seen_low_at = None;
        for i in 0..=(burst + 1) {
            let popped = q.pop().unwrap();
            if popped.id() == low_id {
                seen_low_at = Some(i);
                break;
            }
        }
        assert_eq!(seen_low_at, Some(burst));
    }

    #[test]
    fn test_burst_restarts_without_lower_contention() {
        let mut q = ClassQueues::new();
        let burst = BURST_WEIGHTS[Priority::UserInteractive.index()] as usize;

        // Spend well past the burst with nothing waiting below.
        for _ in 0..(burst * 2) {
            q.push(job(Priority::UserInteractive));
        }
        while q.pop().is_some() {}

        // A fresh contended batch must not yield on its very first pop.
        let high = job(Priority::UserInteractive);
        let high_id = high.id();
        q.push(job(Priority::Background));
        q.push(high);

        assert_eq!(q.pop().map(|j| j.id()), Some(high_id));
    }

    #[test]
    fn test_drain_resets_burst_counts() {
        let mut q = ClassQueues::new();
        let burst = BURST_WEIGHTS[Priority::UserInteractive.index()] as usize;

        // A contended batch that ends mid-burst.
        q.push(job(Priority::Background));
        for _ in 0..(burst / 2) {
            q.push(job(Priority::UserInteractive));
        }
        while q.pop().is_some() {}

        // The next batch gets the full burst before yielding.
        for _ in 0..burst {
            q.push(job(Priority::UserInteractive));
        }
        let low = job(Priority::Background);
        let low_id = low.id();
        q.push(low);

        for _ in 0..burst {
            assert_ne!(q.pop().map(|j| j.id()), Some(low_id));
        }
        assert_eq!(q.pop().map(|j| j.id()), Some(low_id));
    }

    #[test]
    fn test_len_tracks_push_pop() {
        let mut q = ClassQueues::new();
        q.push(job(Priority::Utility));
        q.push(job(Priority::UserInteractive));
        assert_eq!(q.len(), 2);
        q.pop();
        assert_eq!(q.len(), 1);
        q.pop();
        assert!(q.is_empty());
    }
}
