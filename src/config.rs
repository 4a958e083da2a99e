//! Executor configuration.
//!
//! The backing strategy is a process-wide selection made once, when the
//! runtime is constructed, either programmatically or from the
//! `CONVEYOR_EXECUTOR` environment variable. It is fixed thereafter;
//! strategies are never mixed at runtime.

use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Environment variable selecting the backing strategy.
pub const BACKING_ENV_VAR: &str = "CONVEYOR_EXECUTOR";

/// Worker count used when available parallelism cannot be determined.
pub const DEFAULT_WORKER_THREADS_FALLBACK: usize = 4;

/// Upper bound on pool worker threads.
pub const MAX_WORKER_THREADS: usize = 64;

// =============================================================================
// Backing Strategy Selection
// =============================================================================

/// Which backing engine the runtime is built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackingKind {
    /// Single logical thread of control; jobs run when the caller drives
    /// the loop. No real parallelism.
    Cooperative,
    /// Bounded pool of OS worker threads plus a dedicated timer thread.
    #[default]
    Pool,
    /// Non-pooled fallback: one thread per job. Weaker fairness, intended
    /// for constrained environments.
    Minimal,
}

impl FromStr for BackingKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cooperative" => Ok(BackingKind::Cooperative),
            "pool" => Ok(BackingKind::Pool),
            "minimal" => Ok(BackingKind::Minimal),
            other => Err(ConfigError::UnknownBackingKind(other.to_string())),
        }
    }
}

impl BackingKind {
    /// Reads the strategy from [`BACKING_ENV_VAR`].
    ///
    /// An unset variable selects the default (pool) strategy; a set but
    /// unrecognized value is a configuration error.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(BACKING_ENV_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(BackingKind::default()),
        }
    }
}

impl std::fmt::Display for BackingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackingKind::Cooperative => "cooperative",
            BackingKind::Pool => "pool",
            BackingKind::Minimal => "minimal",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing selection named an unknown strategy.
    #[error("unknown backing executor kind '{0}' (expected cooperative, pool, or minimal)")]
    UnknownBackingKind(String),
}

// =============================================================================
// Executor Configuration
// =============================================================================

/// Configuration for the runtime.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Which backing engine to build.
    pub backing: BackingKind,

    /// Worker thread count for the pool engine. Ignored by the other
    /// engines.
    pub worker_threads: usize,
}

impl ExecutorConfig {
    /// Configuration with the given backing strategy and default sizing.
    pub fn with_backing(backing: BackingKind) -> Self {
        Self {
            backing,
            ..Self::default()
        }
    }

    /// Reads the backing selection from the environment, keeping default
    /// sizing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_backing(BackingKind::from_env()?))
    }

    /// Default pool worker count: available parallelism, clamped.
    pub fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_WORKER_THREADS_FALLBACK)
            .min(MAX_WORKER_THREADS)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            backing: BackingKind::default(),
            worker_threads: Self::default_worker_threads(),
        }
    }
}
