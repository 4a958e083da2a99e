//! Interception points for the scheduling operations.
//!
//! Each of the four scheduling entry points can be wrapped or replaced by
//! an embedder-installed hook. An installed hook runs synchronously on the
//! enqueueing thread and receives the job together with a callable that
//! performs the default (un-hooked) behavior; the hook may invoke that
//! callable zero or more times: forward unconditionally, retry, or drop
//! the job entirely.
//!
//! A hook that neither calls the default nor otherwise runs the job
//! silently drops it. That is a documented hazard of the mechanism, not a
//! reported error; responsibility rests with whoever installed the hook.
//!
//! Slots are intended to be set at most once during initialization, before
//! scheduling traffic starts. Overwriting is allowed, but ordering between
//! a writer and concurrent enqueues during the overwrite is the caller's
//! responsibility to synchronize. Readers always observe either no hook or
//! a fully initialized one; the slot lock rules out torn values.

use crate::job::Job;
use parking_lot::RwLock;
use std::sync::Arc;

/// Which scheduling operation a hook intercepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Immediate enqueue onto the global executor.
    Enqueue,
    /// Delayed enqueue.
    EnqueueAfter,
    /// Deadline enqueue.
    EnqueueAt,
    /// Enqueue onto the main executor.
    EnqueueMain,
}

impl HookPoint {
    /// Number of hook points.
    pub const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            HookPoint::Enqueue => 0,
            HookPoint::EnqueueAfter => 1,
            HookPoint::EnqueueAt => 2,
            HookPoint::EnqueueMain => 3,
        }
    }
}

/// A scheduling hook.
///
/// Receives the job (with its schedule metadata already stamped by the
/// runtime, so delay and deadline hooks can read the timing parameters
/// from [`Job::schedule`]) and a callable performing the default behavior.
pub type Hook = Arc<dyn Fn(Job, &dyn Fn(Job)) + Send + Sync>;

/// Process-wide (per-runtime) interception slots, one per scheduling
/// operation.
pub struct HookRegistry {
    slots: [RwLock<Option<Hook>>; HookPoint::COUNT],
}

impl HookRegistry {
    /// Creates a registry with no hooks installed.
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
        }
    }

    /// Installs a hook for one scheduling operation.
    ///
    /// Replaces any previously installed hook for that operation.
    pub fn set(&self, point: HookPoint, hook: Hook) {
        *self.slots[point.index()].write() = Some(hook);
    }

    /// Removes the hook for one scheduling operation, restoring default
    /// behavior.
    pub fn clear(&self, point: HookPoint) {
        *self.slots[point.index()].write() = None;
    }

    /// Returns the installed hook for an operation, if any.
    pub fn get(&self, point: HookPoint) -> Option<Hook> {
        self.slots[point.index()].read().clone()
    }

    /// Returns true if a hook is installed for the operation.
    pub fn is_set(&self, point: HookPoint) -> bool {
        self.slots[point.index()].read().is_some()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("enqueue", &self.is_set(HookPoint::Enqueue))
            .field("enqueue_after", &self.is_set(HookPoint::EnqueueAfter))
            .field("enqueue_at", &self.is_set(HookPoint::EnqueueAt))
            .field("enqueue_main", &self.is_set(HookPoint::EnqueueMain))
            .finish()
    }
}
