//! Opaque executor identity tokens.
//!
//! Logical executors (the main executor, the generic global executor, a
//! custom serial executor) are distinguished by an [`ExecutorId`]: a small
//! opaque value compared by token equality, never by the memory address of
//! an implementation object. An identity is immutable once created and
//! lives as long as the thing it identifies.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for fresh identities. Zero is reserved for the generic sentinel.
static EXECUTOR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle distinguishing logical executors.
///
/// Used purely for equality checks and routing ("is this the main
/// executor?"). The distinguished [`ExecutorId::generic`] sentinel stands
/// for the anonymous global executor and is also what
/// [`current_main_executor`](crate::Runtime::current_main_executor)
/// returns when no main executor has been bound.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutorId(u64);

impl ExecutorId {
    /// Returns the generic/unbound sentinel identity.
    pub fn generic() -> Self {
        Self(0)
    }

    /// Creates a fresh identity, distinct from every other identity in
    /// this process.
    pub fn unique() -> Self {
        Self(EXECUTOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns true if this is the generic sentinel.
    pub fn is_generic(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_generic() {
            write!(f, "ExecutorId(generic)")
        } else {
            write!(f, "ExecutorId({})", self.0)
        }
    }
}
