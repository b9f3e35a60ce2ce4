//! Router configuration parsing and validation.
//!
//! Configuration is consumed once at router construction and never
//! re-read at runtime.
//!
//! # Example configuration (router.yml)
//!
//! ```yaml
//! strategy: adaptive            # offline-first, online-first, adaptive
//!
//! kind_strategies:
//!   code: offline-first         # per-kind strategy override
//!
//! pins:
//!   document: docwise           # adaptive: pin a kind to one engine
//!
//! fallback_orders:
//!   text: [local-llm, cloud-gpt]  # explicit order for non-adaptive strategies
//!
//! cache:
//!   max_entries: 1000
//!   ttl_secs: 3600
//!
//! max_concurrent: 32            # omit for unbounded
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineId;
use crate::error::{RouterError, RouterResult};
use crate::registry::EngineRegistry;
use crate::selector::Strategy;
use crate::task::TaskKind;

/// Result cache sizing and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of live entries; 0 disables caching.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry lifetime, measured from insertion.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    3600
}

/// Full router configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Global selection strategy.
    pub strategy: Strategy,
    /// Per-kind strategy overrides.
    pub kind_strategies: HashMap<TaskKind, Strategy>,
    /// Adaptive per-kind engine pins.
    pub pins: HashMap<TaskKind, EngineId>,
    /// Explicit fallback orders, honoured by the non-adaptive strategies.
    /// An id may repeat to retry the same engine.
    pub fallback_orders: HashMap<TaskKind, Vec<EngineId>>,
    /// Result cache sizing and expiry.
    pub cache: CacheConfig,
    /// Upper bound on concurrently handled tasks. `None` preserves the
    /// unbounded behaviour; set it to protect a small engine fleet.
    pub max_concurrent: Option<usize>,
}

impl RouterConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> RouterResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RouterError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> RouterResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RouterError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// The effective strategy for a task kind.
    pub fn strategy_for(&self, kind: TaskKind) -> Strategy {
        self.kind_strategies
            .get(&kind)
            .copied()
            .unwrap_or(self.strategy)
    }

    /// Reject any pin or fallback-order entry referencing an engine id
    /// that is not registered. Run at router construction, before the
    /// first task is handled.
    pub fn validate(&self, registry: &EngineRegistry) -> RouterResult<()> {
        for (kind, id) in &self.pins {
            if !registry.contains(id) {
                return Err(RouterError::InvalidConfig(format!(
                    "pin for {kind} tasks references unregistered engine '{id}'"
                )));
            }
        }
        for (kind, order) in &self.fallback_orders {
            for id in order {
                if !registry.contains(id) {
                    return Err(RouterError::InvalidConfig(format!(
                        "fallback order for {kind} tasks references unregistered engine '{id}'"
                    )));
                }
            }
        }
        Ok(())
    }
}
