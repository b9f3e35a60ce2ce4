//! Router error taxonomy.
//!
//! Individual engine failures ([`crate::engine::EngineError`]) are
//! recovered locally by the fallback executor; only total exhaustion
//! surfaces, and it carries the full per-engine failure map so callers can
//! tell a transient network issue on one engine from a capability gap on
//! another. Cache faults never propagate at all.

use crate::engine::EngineId;
use crate::task::TaskKind;

/// A single engine's failure during a fallback walk, keyed by engine id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub engine: EngineId,
    pub reason: String,
}

impl EngineFailure {
    pub fn new(engine: EngineId, reason: impl Into<String>) -> Self {
        Self {
            engine,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the router and its components.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// No capable, available engine exists for the task kind.
    #[error("no available engine supports {kind} tasks")]
    EngineUnavailable { kind: TaskKind },

    /// An engine with this id is already registered.
    #[error("engine already registered: {0}")]
    DuplicateEngine(EngineId),

    /// A lookup or configuration entry referenced an unregistered id.
    #[error("unknown engine: {0}")]
    UnknownEngine(EngineId),

    /// Every candidate in the fallback order failed.
    #[error("all engines exhausted for {kind} task: [{}]", format_failures(.failures))]
    AllEnginesExhausted {
        kind: TaskKind,
        failures: Vec<EngineFailure>,
    },

    /// Startup configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RouterResult<T> = Result<T, RouterError>;

fn format_failures(failures: &[EngineFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.engine, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Internal cache malfunction.
///
/// Logged and treated as a miss by the router; a cache fault degrades the
/// system to "always execute", it never blocks a task.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cache fault: {0}")]
pub struct CacheFault(pub String);
