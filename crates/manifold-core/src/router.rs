//! The router facade.
//!
//! Single entry point for task execution: fingerprint, cache lookup,
//! candidate selection, sequential fallback execution, then metrics and
//! cache bookkeeping. The registry, cache, and metrics collector are
//! injected at construction; there is no process-wide state, so routers
//! can be built in isolation for tests.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::{CachedResult, ResultCache};
use crate::config::RouterConfig;
use crate::engine::{EngineId, Locality};
use crate::error::{RouterError, RouterResult};
use crate::fallback;
use crate::metrics::{EngineStats, MetricsCollector};
use crate::registry::EngineRegistry;
use crate::selector::{self, Strategy};
use crate::task::Task;

/// The routed outcome of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Opaque result payload.
    pub result: String,
    /// The engine that produced the result, or produced it originally for
    /// a cached outcome.
    pub engine: EngineId,
    /// Whether the result came from the cache.
    pub cached: bool,
    /// Wall-clock time spent executing, summed over failed attempts and
    /// the successful one. Zero for cache hits.
    pub response_time_ms: u64,
}

/// One engine's registration state, as reported by [`Router::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct EngineAvailability {
    pub id: EngineId,
    pub name: String,
    pub locality: Locality,
    pub available: bool,
}

/// Cache occupancy and effectiveness counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Administrative snapshot of the router's moving parts.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    pub strategy: Strategy,
    pub engines: Vec<EngineAvailability>,
    pub cache: CacheStats,
    pub metrics: HashMap<EngineId, EngineStats>,
}

/// Routes tasks across the registered engines.
pub struct Router {
    registry: EngineRegistry,
    config: RouterConfig,
    cache: ResultCache,
    metrics: MetricsCollector,
    limiter: Option<Semaphore>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Build a router over a fully populated registry.
    ///
    /// Validates the configuration against the registry before the first
    /// task is handled; a pin or fallback order naming an unregistered
    /// engine is rejected here rather than misrouting later.
    pub fn new(registry: EngineRegistry, config: RouterConfig) -> RouterResult<Self> {
        config.validate(&registry)?;
        let cache = ResultCache::new(config.cache.max_entries, config.cache.ttl());
        let limiter = config.max_concurrent.map(Semaphore::new);
        Ok(Self {
            registry,
            config,
            cache,
            metrics: MetricsCollector::new(),
            limiter,
        })
    }

    /// Handle one task: cache lookup, candidate selection, fallback
    /// execution, then cache and metrics updates.
    ///
    /// There is no caller-imposed deadline; once an engine call begins it
    /// runs to completion or failure. Callers needing one can wrap this
    /// future in `tokio::time::timeout`.
    pub async fn handle(&self, task: &Task) -> RouterResult<RouteOutcome> {
        // The semaphore is never closed, so acquire cannot fail here.
        let _permit = match &self.limiter {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        let fingerprint = task.fingerprint();
        match self.cache.get(&fingerprint) {
            Ok(Some(cached)) => {
                self.metrics.record_cache_hit();
                debug!(engine = %cached.engine, kind = %task.kind, "cache hit");
                return Ok(RouteOutcome {
                    result: cached.result,
                    engine: cached.engine,
                    cached: true,
                    response_time_ms: 0,
                });
            }
            Ok(None) => self.metrics.record_cache_miss(),
            Err(fault) => {
                warn!(error = %fault, "cache lookup fault, treating as miss");
                self.metrics.record_cache_miss();
            }
        }

        let order = self.candidate_order(task)?;
        let started = Instant::now();
        match fallback::execute_chain(&self.registry, task, &order).await {
            Ok(success) => {
                let response_time_ms = started.elapsed().as_millis() as u64;
                for failure in &success.failures {
                    self.metrics.record_failure(&failure.engine);
                }
                self.metrics.record_success(&success.engine, response_time_ms);

                let value = CachedResult {
                    result: success.result.clone(),
                    engine: success.engine.clone(),
                };
                if let Err(fault) = self.cache.put(fingerprint, value) {
                    warn!(error = %fault, "cache store fault, result not cached");
                }

                Ok(RouteOutcome {
                    result: success.result,
                    engine: success.engine,
                    cached: false,
                    response_time_ms,
                })
            }
            Err(err) => {
                if let RouterError::AllEnginesExhausted { failures, .. } = &err {
                    for failure in failures {
                        self.metrics.record_failure(&failure.engine);
                    }
                }
                Err(err)
            }
        }
    }

    /// Candidate order for a task: the selector's ranking, with the
    /// task's preferred engine, when set and available, moved to the
    /// head. A preference naming an unregistered engine is an error; an
    /// unavailable preference is ignored with a warning.
    fn candidate_order(&self, task: &Task) -> RouterResult<Vec<EngineId>> {
        let strategy = self.config.strategy_for(task.kind);
        let snapshot = self.metrics.snapshot();
        let selected = selector::select(
            task.kind,
            strategy,
            &self.registry,
            &snapshot,
            self.config.pins.get(&task.kind),
            self.config
                .fallback_orders
                .get(&task.kind)
                .map(|order| order.as_slice()),
        );

        let mut order = match (selected, &task.preferred_engine) {
            (Ok(order), _) => order,
            // A preference can still name a viable engine outside the
            // capability-filtered set.
            (Err(RouterError::EngineUnavailable { .. }), Some(_)) => Vec::new(),
            (Err(err), _) => return Err(err),
        };

        if let Some(preferred) = &task.preferred_engine {
            let entry = self.registry.get(preferred)?;
            if entry.available {
                order.retain(|id| id != preferred);
                order.insert(0, preferred.clone());
            } else {
                warn!(engine = %preferred, "preferred engine unavailable, using computed order");
            }
        }

        if order.is_empty() {
            return Err(RouterError::EngineUnavailable { kind: task.kind });
        }
        Ok(order)
    }

    /// Administrative cache flush.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("cache cleared");
    }

    /// Administrative metrics reset.
    pub fn clear_metrics(&self) {
        self.metrics.clear();
        debug!("metrics cleared");
    }

    /// Aggregated per-engine metrics.
    pub fn metrics_snapshot(&self) -> HashMap<EngineId, EngineStats> {
        self.metrics.snapshot()
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Registry availability, cache counters, and the metrics snapshot.
    pub fn stats(&self) -> RouterStats {
        let engines = self
            .registry
            .iter()
            .map(|entry| EngineAvailability {
                id: entry.id().clone(),
                name: entry.descriptor.name.clone(),
                locality: entry.descriptor.locality,
                available: entry.available,
            })
            .collect();

        let hits = self.metrics.cache_hits();
        let misses = self.metrics.cache_misses();
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        RouterStats {
            strategy: self.config.strategy,
            engines,
            cache: CacheStats {
                size: self.cache.len(),
                max_entries: self.cache.max_entries(),
                hits,
                misses,
                hit_rate,
            },
            metrics: self.metrics.snapshot(),
        }
    }
}
