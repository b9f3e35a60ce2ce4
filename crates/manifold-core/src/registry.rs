//! Engine registry.
//!
//! Engines are registered once at process start and never removed. An
//! engine whose `initialize` probe fails is retained but flagged
//! unavailable, so diagnostics can distinguish "no candidate exists" from
//! "a candidate exists but is down". Registration order is preserved; it
//! is the documented tie-break everywhere candidates are ranked.

use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::{Engine, EngineDescriptor, EngineId};
use crate::error::{RouterError, RouterResult};
use crate::task::TaskKind;

/// A registered engine: static metadata, the availability flag set at
/// registration, and the execution handle.
pub struct RegisteredEngine {
    pub descriptor: EngineDescriptor,
    /// Set once from the `initialize` probe; never re-probed at runtime.
    pub available: bool,
    engine: Arc<dyn Engine>,
}

impl std::fmt::Debug for RegisteredEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredEngine")
            .field("descriptor", &self.descriptor)
            .field("available", &self.available)
            .finish_non_exhaustive()
    }
}

impl RegisteredEngine {
    pub fn id(&self) -> &EngineId {
        &self.descriptor.id
    }

    pub fn engine(&self) -> Arc<dyn Engine> {
        Arc::clone(&self.engine)
    }
}

/// Holds every registered engine in registration order.
#[derive(Default)]
pub struct EngineRegistry {
    entries: Vec<RegisteredEngine>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine, running its `initialize` probe once.
    ///
    /// A probe returning `false` keeps the entry but marks it unavailable.
    /// Duplicate ids are rejected.
    pub async fn register(
        &mut self,
        descriptor: EngineDescriptor,
        engine: Arc<dyn Engine>,
    ) -> RouterResult<()> {
        if self.contains(&descriptor.id) {
            return Err(RouterError::DuplicateEngine(descriptor.id));
        }

        let available = engine.initialize().await;
        if available {
            info!(engine = %descriptor.id, locality = ?descriptor.locality, "engine registered");
        } else {
            warn!(engine = %descriptor.id, "engine failed to initialize, registered as unavailable");
        }

        self.entries.push(RegisteredEngine {
            descriptor,
            available,
            engine,
        });
        Ok(())
    }

    pub fn contains(&self, id: &EngineId) -> bool {
        self.entries.iter().any(|e| e.id() == id)
    }

    pub fn get(&self, id: &EngineId) -> RouterResult<&RegisteredEngine> {
        self.entries
            .iter()
            .find(|e| e.id() == id)
            .ok_or_else(|| RouterError::UnknownEngine(id.clone()))
    }

    /// All engines declaring the given kind, in registration order,
    /// regardless of availability. Callers filter availability explicitly.
    pub fn by_kind(&self, kind: TaskKind) -> Vec<&RegisteredEngine> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.supports(kind))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredEngine> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
