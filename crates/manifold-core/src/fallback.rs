//! Sequential fallback execution.
//!
//! Walks the candidate order one engine at a time: the first success wins,
//! each failure is recorded under the failing engine's id and the walk
//! advances. Attempts are never concurrent or hedged, so a task's total
//! latency is the sum of its failed attempts plus the successful one.
//! There is no per-engine retry; an id appearing twice in a custom order
//! is the configured way to retry the same engine.

use tracing::{debug, warn};

use crate::engine::EngineId;
use crate::error::{EngineFailure, RouterError, RouterResult};
use crate::registry::EngineRegistry;
use crate::task::Task;

/// The outcome of a successful fallback walk: the result, the engine that
/// produced it, and the failures absorbed on the way there.
#[derive(Debug)]
pub struct FallbackSuccess {
    pub result: String,
    pub engine: EngineId,
    pub failures: Vec<EngineFailure>,
}

/// Execute `task` against `candidates` in order.
///
/// Exhausting the list raises [`RouterError::AllEnginesExhausted`] with
/// one entry per failed attempt; the per-engine detail is the point, it is
/// never collapsed into a generic message.
pub async fn execute_chain(
    registry: &EngineRegistry,
    task: &Task,
    candidates: &[EngineId],
) -> RouterResult<FallbackSuccess> {
    let mut failures: Vec<EngineFailure> = Vec::new();

    for id in candidates {
        let entry = match registry.get(id) {
            Ok(entry) => entry,
            Err(err) => {
                failures.push(EngineFailure::new(id.clone(), err.to_string()));
                continue;
            }
        };

        match entry.engine().execute(task).await {
            Ok(result) => {
                debug!(engine = %id, kind = %task.kind, attempts = failures.len() + 1, "engine execution succeeded");
                return Ok(FallbackSuccess {
                    result,
                    engine: id.clone(),
                    failures,
                });
            }
            Err(err) => {
                warn!(engine = %id, kind = %task.kind, error = %err, "engine execution failed, advancing fallback chain");
                failures.push(EngineFailure::new(id.clone(), err.to_string()));
            }
        }
    }

    Err(RouterError::AllEnginesExhausted {
        kind: task.kind,
        failures,
    })
}
