//! Conveyor - Global concurrent job executor
//!
//! This library provides the scheduling substrate for lightweight units of
//! work ("jobs"): immediate, delayed, and deadline-based execution on a
//! bounded pool of OS threads, plus a distinguished single-threaded "main"
//! execution context.
//!
//! # Architecture
//!
//! The executor follows a layered design:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Runtime                               │
//! │  enqueue / enqueue_after / enqueue_at / enqueue_main        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Hook        │  │ Main        │  │ Trace               │  │
//! │  │ Registry    │  │ Binding     │  │ Sink                │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    BackingExecutor                           │
//! │  Cooperative loop │ OS thread pool │ Thread-per-job         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Job**: An opaque unit of work with a priority class and an entry
//!   point that runs exactly once. The executor never inspects the payload.
//!
//! - **Backing executor**: The engine that actually runs jobs. One of three
//!   mutually exclusive strategies is selected when the runtime is built:
//!   a cooperative single-threaded run loop, an OS thread pool with a
//!   dedicated timer thread, or a minimal thread-per-job fallback.
//!
//! - **Hooks**: Each of the four scheduling operations can be intercepted
//!   by an embedder-installed hook that receives the job plus a callable
//!   performing the default behavior.
//!
//! - **Main executor**: A process-wide binding of one serial executor
//!   identity. Jobs enqueued on main run strictly in FIFO order, one at a
//!   time, regardless of which backing strategy is active.
//!
//! # Example
//!
//! ```
//! use conveyor::{ExecutorConfig, Job, Priority, Runtime};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let runtime = Runtime::new(ExecutorConfig::default());
//! let counter = Arc::new(AtomicUsize::new(0));
//!
//! let c = Arc::clone(&counter);
//! runtime.enqueue(Job::new(Priority::Default, move || {
//!     c.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! runtime.shutdown();
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//! ```
//!
//! # Observability
//!
//! Every scheduling operation emits exactly one structured [`TraceEvent`]
//! to the configured [`TraceSink`], synchronously, before delegation to the
//! backing engine. See the [`trace`] module for the built-in sinks.

// Module declarations
pub mod backing;
pub mod config;
pub mod hooks;
pub mod identity;
pub mod job;
pub mod main_binding;
pub mod queue;
pub mod runtime;
pub mod time;
pub mod timer;
pub mod trace;

// Job types
pub use job::{Job, JobId, Priority, Schedule};

// Identity
pub use identity::ExecutorId;

// Time types
pub use time::{ClockKind, Deadline};

// Hooks
pub use hooks::{Hook, HookPoint, HookRegistry};

// Main executor binding
pub use main_binding::{MainBinding, MainRunner, SerialMainRunner};

// Backing engines
pub use backing::{
    BackingExecutor, CooperativeExecutor, MinimalExecutor, PoolExecutor,
};

// Configuration
pub use config::{
    BackingKind, ConfigError, ExecutorConfig, BACKING_ENV_VAR,
    DEFAULT_WORKER_THREADS_FALLBACK, MAX_WORKER_THREADS,
};

// Trace sinks
pub use trace::{
    MultiplexTraceSink, NullTraceSink, TraceEvent, TraceSink, TracingTraceSink,
};

// Runtime facade
pub use runtime::Runtime;

/// Version of the conveyor library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
