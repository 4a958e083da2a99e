//! Runtime facade: the four scheduling operations.
//!
//! A [`Runtime`] owns the configured backing engine, the hook registry,
//! the main executor binding, and the trace sink, so tests can build an
//! isolated runtime per test instead of sharing process-wide singletons.
//! Embedders that want the classic process-global executor install one
//! runtime once via [`Runtime::install`] and reach it through
//! [`Runtime::global`].
//!
//! Every operation has the same shape: stamp the job's schedule, emit
//! exactly one trace event synchronously, consult the hook registry, and
//! delegate to the backing engine (or the bound main runner). All four
//! are fire-and-forget: they publish the job and return without waiting
//! for it to run, and no error is surfaced back to the caller. Handoff
//! to the executing thread goes through the engine's locks, which give
//! the release/acquire pairing that makes the job's prior writes visible
//! to whichever thread runs it.

use crate::backing::{self, BackingExecutor};
use crate::config::ExecutorConfig;
use crate::hooks::{Hook, HookPoint, HookRegistry};
use crate::identity::ExecutorId;
use crate::job::{Job, Schedule};
use crate::main_binding::{MainBinding, MainRunner, SerialMainRunner};
use crate::time::Deadline;
use crate::trace::{NullTraceSink, TraceEvent, TraceSink};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// The installed process-global runtime, if any.
static GLOBAL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The global concurrent job executor.
pub struct Runtime {
    config: ExecutorConfig,
    backing: Arc<dyn BackingExecutor>,
    hooks: HookRegistry,
    main: MainBinding,
    trace: Arc<dyn TraceSink>,
}

impl Runtime {
    /// Builds a runtime with the configured backing engine and no trace
    /// sink.
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_trace(config, Arc::new(NullTraceSink))
    }

    /// Builds a runtime with a trace sink.
    pub fn with_trace(config: ExecutorConfig, trace: Arc<dyn TraceSink>) -> Self {
        let backing = backing::build(&config);
        tracing::info!(backing = %config.backing, "Executor runtime started");
        Self {
            config,
            backing,
            hooks: HookRegistry::new(),
            main: MainBinding::new(),
            trace,
        }
    }

    /// Returns the runtime's configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    // =========================================================================
    // Scheduling operations
    // =========================================================================

    /// Schedules a job for execution as soon as a worker is free,
    /// respecting priority order among already-enqueued jobs.
    pub fn enqueue(&self, mut job: Job) {
        job.set_schedule(Schedule::Immediate);
        self.trace.emit(TraceEvent::JobEnqueued {
            job_id: job.id(),
            priority: job.priority(),
        });
        self.dispatch(HookPoint::Enqueue, job);
    }

    /// Schedules a job to run no earlier than `now + delay`.
    ///
    /// There is no hard upper bound on lateness; timeliness is best-effort,
    /// bounded by worker availability.
    pub fn enqueue_after(&self, delay: Duration, mut job: Job) {
        job.set_schedule(Schedule::After {
            fire_at: Instant::now() + delay,
            delay,
        });
        self.trace.emit(TraceEvent::JobEnqueuedAfter {
            job_id: job.id(),
            priority: job.priority(),
            delay,
        });
        self.dispatch(HookPoint::EnqueueAfter, job);
    }

    /// Schedules a job for a point on a specified clock, with an allowed
    /// leeway window.
    ///
    /// The job never starts before `deadline`; the system may coalesce or
    /// delay firing up to `deadline + leeway`.
    pub fn enqueue_at(&self, deadline: Deadline, leeway: Duration, mut job: Job) {
        job.set_schedule(Schedule::At {
            fire_at: deadline.resolve(),
            leeway,
            clock: deadline.clock(),
        });
        self.trace.emit(TraceEvent::JobEnqueuedAt {
            job_id: job.id(),
            priority: job.priority(),
            clock: deadline.clock(),
            leeway,
        });
        self.dispatch(HookPoint::EnqueueAt, job);
    }

    /// Schedules a job on the bound main executor, strictly after every
    /// main job enqueued before it.
    ///
    /// # Panics
    ///
    /// Panics if no main executor has been bound. That is a programmer
    /// error (main must be bound during startup, before any main
    /// enqueue), not a runtime condition to recover from.
    pub fn enqueue_main(&self, mut job: Job) {
        let runner = self
            .main
            .runner()
            .unwrap_or_else(|| panic!("enqueue_main with no main executor bound"));

        job.set_schedule(Schedule::Immediate);
        self.trace.emit(TraceEvent::JobEnqueuedMain { job_id: job.id() });

        if let Some(hook) = self.hooks.get(HookPoint::EnqueueMain) {
            let original: &dyn Fn(Job) = &|job| runner.enqueue_main(job);
            hook(job, original);
        } else {
            runner.enqueue_main(job);
        }
    }

    /// Consults the hook registry and delegates to the backing engine.
    fn dispatch(&self, point: HookPoint, job: Job) {
        if let Some(hook) = self.hooks.get(point) {
            let original: &dyn Fn(Job) = &|job| self.backing.submit(job);
            hook(job, original);
        } else {
            self.backing.submit(job);
        }
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    /// Installs a hook for one scheduling operation.
    ///
    /// Intended to be called during initialization, before scheduling
    /// traffic starts; see [`HookRegistry`] for the overwrite caveats.
    pub fn set_hook(&self, point: HookPoint, hook: Hook) {
        self.hooks.set(point, hook);
    }

    /// Removes the hook for one scheduling operation.
    pub fn clear_hook(&self, point: HookPoint) {
        self.hooks.clear(point);
    }

    // =========================================================================
    // Main executor binding
    // =========================================================================

    /// Binds the main executor identity and implementation as a matched
    /// pair. Privileged; expected at most once during startup, before any
    /// [`enqueue_main`](Self::enqueue_main) call.
    pub fn bind_main(&self, identity: ExecutorId, runner: Arc<dyn MainRunner>) {
        self.main.bind(identity, runner);
    }

    /// Binds a fresh identity to the stock serial runner and returns the
    /// identity.
    pub fn bind_main_default(&self) -> ExecutorId {
        let identity = ExecutorId::unique();
        self.bind_main(identity, Arc::new(SerialMainRunner::new()));
        identity
    }

    /// Clears the main binding. Privileged; for teardown in tests.
    pub fn reset_main(&self) {
        self.main.reset();
    }

    /// Returns true if `identity` is the bound main executor; false (not
    /// an error) when unbound.
    pub fn is_main_executor(&self, identity: ExecutorId) -> bool {
        self.main.is_main_executor(identity)
    }

    /// Returns the bound main identity, or the generic sentinel when
    /// unbound.
    pub fn current_main_executor(&self) -> ExecutorId {
        self.main.current()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Runs pending work on the calling thread (cooperative engine only;
    /// a no-op on the threaded engines).
    pub fn drive(&self) {
        self.backing.drive();
    }

    /// Stops the runtime: drains runnable work, joins engine threads, and
    /// shuts down the bound main runner if any. Jobs still waiting on a
    /// timer are discarded.
    pub fn shutdown(&self) {
        self.backing.shutdown();
        if let Some(runner) = self.main.runner() {
            runner.shutdown();
        }
        tracing::info!("Executor runtime stopped");
    }

    // =========================================================================
    // Process-global runtime
    // =========================================================================

    /// Installs this runtime as the process-global executor.
    ///
    /// Returns the installed reference, or an error carrying the runtime
    /// back if a global runtime was already installed.
    pub fn install(self) -> Result<&'static Runtime, Runtime> {
        match GLOBAL_RUNTIME.set(self) {
            Ok(()) => Ok(Runtime::global()),
            Err(runtime) => Err(runtime),
        }
    }

    /// Returns the installed process-global runtime.
    ///
    /// # Panics
    ///
    /// Panics if [`Runtime::install`] has not been called.
    pub fn global() -> &'static Runtime {
        GLOBAL_RUNTIME
            .get()
            .unwrap_or_else(|| panic!("no global executor runtime installed"))
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("backing", &self.config.backing)
            .field("hooks", &self.hooks)
            .field("main", &self.main)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackingKind;
    use crate::job::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runtime(backing: BackingKind) -> Runtime {
        Runtime::new(ExecutorConfig::with_backing(backing))
    }

    #[test]
    fn test_runtime_creation_all_backings() {
        for backing in [
            BackingKind::Cooperative,
            BackingKind::Pool,
            BackingKind::Minimal,
        ] {
            let rt = runtime(backing);
            assert_eq!(rt.config().backing, backing);
            rt.shutdown();
        }
    }

    #[test]
    fn test_enqueue_runs_job() {
        let rt = runtime(BackingKind::Pool);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        rt.enqueue(Job::new(Priority::Default, move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        rt.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "no main executor bound")]
    fn test_enqueue_main_unbound_panics() {
        let rt = runtime(BackingKind::Cooperative);
        rt.enqueue_main(Job::new(Priority::Default, || {}));
    }

    #[test]
    fn test_main_identity_scenario() {
        let rt = runtime(BackingKind::Cooperative);
        assert!(rt.current_main_executor().is_generic());

        let main_id = rt.bind_main_default();
        let other_id = ExecutorId::unique();

        assert!(rt.is_main_executor(main_id));
        assert!(!rt.is_main_executor(other_id));
        assert_eq!(rt.current_main_executor(), main_id);

        rt.shutdown();
    }

    #[test]
    fn test_hook_receives_job_and_original() {
        let rt = runtime(BackingKind::Cooperative);
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let job_runs = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hook_calls);
        rt.set_hook(
            HookPoint::Enqueue,
            Arc::new(move |job, original| {
                h.fetch_add(1, Ordering::SeqCst);
                original(job);
            }),
        );

        let j = Arc::clone(&job_runs);
        rt.enqueue(Job::new(Priority::Default, move || {
            j.fetch_add(1, Ordering::SeqCst);
        }));
        rt.drive();

        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert_eq!(job_runs.load(Ordering::SeqCst), 1);

        rt.clear_hook(HookPoint::Enqueue);
        rt.shutdown();
    }

    #[test]
    fn test_trace_event_per_operation() {
        use crate::trace::TraceEvent;
        use parking_lot::Mutex;

        struct RecordingSink(Mutex<Vec<&'static str>>);
        impl TraceSink for RecordingSink {
            fn emit(&self, event: TraceEvent) {
                self.0.lock().push(event.event_type());
            }
        }

        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let rt = Runtime::with_trace(
            ExecutorConfig::with_backing(BackingKind::Cooperative),
            Arc::clone(&sink) as Arc<dyn TraceSink>,
        );
        rt.bind_main_default();

        rt.enqueue(Job::new(Priority::Default, || {}));
        rt.enqueue_after(Duration::from_millis(1), Job::new(Priority::Default, || {}));
        rt.enqueue_at(
            Deadline::Monotonic(Instant::now()),
            Duration::ZERO,
            Job::new(Priority::Default, || {}),
        );
        rt.enqueue_main(Job::new(Priority::Default, || {}));

        assert_eq!(
            *sink.0.lock(),
            vec![
                "job_enqueued",
                "job_enqueued_after",
                "job_enqueued_at",
                "job_enqueued_main",
            ]
        );

        rt.shutdown();
    }
}
