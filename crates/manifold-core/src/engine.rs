//! The engine execution contract.
//!
//! Every processing engine, local or remote, is opaque to the router and
//! implements [`Engine`]: a one-shot `initialize` probe at registration
//! time and an `execute` call per task. The router never inspects engine
//! internals beyond this trait.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind};

/// Typed engine identifier.
///
/// Engine ids are plain strings on the wire but are carried as a newtype
/// so configuration references can be validated at startup instead of
/// failing as silent map misses at request time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(String);

impl EngineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EngineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EngineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where an engine executes.
///
/// Drives the offline-first and online-first selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    /// On-device or in-process execution
    Local,
    /// Network-reached execution (cloud APIs, remote workers)
    Remote,
}

/// Failure of a single engine call.
///
/// Absorbed by the fallback executor and recorded as that engine's
/// failure reason; never surfaced to the caller on its own.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("unsupported task: {0}")]
    Unsupported(String),

    #[error("execution failed: {0}")]
    Failed(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Static metadata supplied when an engine is registered.
///
/// Holds identity and declared capabilities only. Connections and runtime
/// state live behind the [`Engine`] implementation.
#[derive(Debug, Clone)]
pub struct EngineDescriptor {
    /// Unique identifier (e.g., `"local-llm"`, `"cloud-gpt"`)
    pub id: EngineId,
    /// Human-readable name
    pub name: String,
    /// Local or remote execution
    pub locality: Locality,
    /// Task kinds this engine can serve
    pub capabilities: Vec<TaskKind>,
}

impl EngineDescriptor {
    pub fn new(
        id: impl Into<EngineId>,
        name: impl Into<String>,
        locality: Locality,
        capabilities: Vec<TaskKind>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locality,
            capabilities,
        }
    }

    /// Whether this engine declares the given task kind.
    pub fn supports(&self, kind: TaskKind) -> bool {
        self.capabilities.contains(&kind)
    }
}

/// A pluggable task execution engine.
///
/// `initialize` is called exactly once, at registration. Returning `false`
/// marks the engine unavailable for the lifetime of the process without
/// raising; it stays registered so diagnostics can report it. There is no
/// runtime re-probe.
#[async_trait]
pub trait Engine: Send + Sync {
    /// One-shot startup probe. Defaults to ready.
    async fn initialize(&self) -> bool {
        true
    }

    /// Execute a task, returning the opaque result payload.
    async fn execute(&self, task: &Task) -> EngineResult<String>;
}
