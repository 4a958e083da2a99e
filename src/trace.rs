//! Trace events for scheduling observability.
//!
//! Each scheduling operation emits exactly one structured event via a sink
//! abstraction, synchronously on the caller's thread, before the job is
//! delegated to the backing engine. The executor doesn't know how events
//! are consumed—this follows the "emit, don't present" pattern: consumers
//! (logging, metrics, test probes) decide how to present or aggregate.
//!
//! # Example
//!
//! ```
//! use conveyor::{TraceEvent, TraceSink};
//!
//! struct LoggingSink;
//!
//! impl TraceSink for LoggingSink {
//!     fn emit(&self, event: TraceEvent) {
//!         tracing::info!(?event, "Scheduling event");
//!     }
//! }
//! ```

use crate::job::{JobId, Priority};
use crate::time::ClockKind;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Trace Events
// =============================================================================

/// Events emitted by the four scheduling operations.
///
/// One event per operation, carrying the operation kind, the job identity,
/// and the relevant timing parameters.
#[derive(Clone, Debug)]
pub enum TraceEvent {
    /// A job was enqueued for immediate execution.
    JobEnqueued { job_id: JobId, priority: Priority },

    /// A job was enqueued to run after a delay.
    JobEnqueuedAfter {
        job_id: JobId,
        priority: Priority,
        delay: Duration,
    },

    /// A job was enqueued to run at a deadline.
    JobEnqueuedAt {
        job_id: JobId,
        priority: Priority,
        clock: ClockKind,
        leeway: Duration,
    },

    /// A job was enqueued onto the main executor.
    JobEnqueuedMain { job_id: JobId },
}

impl TraceEvent {
    /// Returns the job ID associated with this event.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::JobEnqueued { job_id, .. }
            | Self::JobEnqueuedAfter { job_id, .. }
            | Self::JobEnqueuedAt { job_id, .. }
            | Self::JobEnqueuedMain { job_id } => *job_id,
        }
    }

    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobEnqueued { .. } => "job_enqueued",
            Self::JobEnqueuedAfter { .. } => "job_enqueued_after",
            Self::JobEnqueuedAt { .. } => "job_enqueued_at",
            Self::JobEnqueuedMain { .. } => "job_enqueued_main",
        }
    }
}

// =============================================================================
// Trace Sink Trait
// =============================================================================

/// Sink for scheduling trace events.
///
/// Implementations must be thread-safe (`Send + Sync`); the four scheduling
/// operations may be called from any thread. `emit` runs synchronously on
/// the enqueueing thread, so it should be fast and non-blocking.
pub trait TraceSink: Send + Sync {
    /// Called once per scheduling operation, before delegation.
    fn emit(&self, event: TraceEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// No-op sink for when tracing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&self, _event: TraceEvent) {
        // Intentionally empty
    }
}

/// Sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTraceSink;

impl TraceSink for TracingTraceSink {
    fn emit(&self, event: TraceEvent) {
        match &event {
            TraceEvent::JobEnqueued { job_id, priority } => {
                tracing::trace!(
                    job_id = %job_id,
                    priority = %priority,
                    "Job enqueued"
                );
            }
            TraceEvent::JobEnqueuedAfter {
                job_id,
                priority,
                delay,
            } => {
                tracing::trace!(
                    job_id = %job_id,
                    priority = %priority,
                    delay_ms = delay.as_millis(),
                    "Job enqueued with delay"
                );
            }
            TraceEvent::JobEnqueuedAt {
                job_id,
                priority,
                clock,
                leeway,
            } => {
                tracing::trace!(
                    job_id = %job_id,
                    priority = %priority,
                    clock = ?clock,
                    leeway_ms = leeway.as_millis(),
                    "Job enqueued with deadline"
                );
            }
            TraceEvent::JobEnqueuedMain { job_id } => {
                tracing::trace!(job_id = %job_id, "Job enqueued on main");
            }
        }
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTraceSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl MultiplexTraceSink {
    /// Creates a new multiplex sink with the given sinks.
    pub fn new(sinks: Vec<Arc<dyn TraceSink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink to the multiplex.
    pub fn add_sink(&mut self, sink: Arc<dyn TraceSink>) {
        self.sinks.push(sink);
    }
}

impl TraceSink for MultiplexTraceSink {
    fn emit(&self, event: TraceEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexTraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexTraceSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_null_sink() {
        let job = Job::new(Priority::Default, || {});
        let sink = NullTraceSink;
        // Should not panic
        sink.emit(TraceEvent::JobEnqueued {
            job_id: job.id(),
            priority: job.priority(),
        });
    }

    #[test]
    fn test_tracing_sink() {
        let job = Job::new(Priority::Default, || {});
        let sink = TracingTraceSink;
        // Should not panic (subscriber may or may not be configured)
        sink.emit(TraceEvent::JobEnqueuedMain { job_id: job.id() });
    }

    #[test]
    fn test_event_job_id() {
        let job = Job::new(Priority::Utility, || {});
        let event = TraceEvent::JobEnqueuedAfter {
            job_id: job.id(),
            priority: job.priority(),
            delay: Duration::from_millis(10),
        };
        assert_eq!(event.job_id(), job.id());
    }

    #[test]
    fn test_event_type_names() {
        let job = Job::new(Priority::Default, || {});
        assert_eq!(
            TraceEvent::JobEnqueued {
                job_id: job.id(),
                priority: job.priority(),
            }
            .event_type(),
            "job_enqueued"
        );
        assert_eq!(
            TraceEvent::JobEnqueuedMain { job_id: job.id() }.event_type(),
            "job_enqueued_main"
        );
    }

    #[test]
    fn test_multiplex_sink() {
        struct CountingSink(AtomicUsize);

        impl TraceSink for CountingSink {
            fn emit(&self, _event: TraceEvent) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let sink1 = Arc::new(CountingSink(AtomicUsize::new(0)));
        let sink2 = Arc::new(CountingSink(AtomicUsize::new(0)));

        let multiplex = MultiplexTraceSink::new(vec![
            Arc::clone(&sink1) as Arc<dyn TraceSink>,
            Arc::clone(&sink2) as Arc<dyn TraceSink>,
        ]);

        let job = Job::new(Priority::Default, || {});
        multiplex.emit(TraceEvent::JobEnqueuedMain { job_id: job.id() });

        assert_eq!(sink1.0.load(Ordering::Relaxed), 1);
        assert_eq!(sink2.0.load(Ordering::Relaxed), 1);
    }
}
