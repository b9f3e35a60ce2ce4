//! Candidate selection strategies.
//!
//! Given a task kind and the configured strategy, [`select`] produces the
//! full candidate order the fallback executor walks: primary choice first,
//! then every remaining fallback. Unavailable engines are excluded from
//! the order entirely, not merely deprioritized. Decisions are
//! deterministic for a given (strategy, kind, metrics snapshot);
//! equally-ranked engines keep registration order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{EngineId, Locality};
use crate::error::{RouterError, RouterResult};
use crate::metrics::EngineStats;
use crate::registry::{EngineRegistry, RegisteredEngine};
use crate::task::TaskKind;

/// The policy governing candidate ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Local engines before remote ones, independent of metrics.
    OfflineFirst,
    /// Remote engines before local ones.
    OnlineFirst,
    /// Configured pins take priority; otherwise rank by recorded average
    /// latency, with registration order as tie-break.
    #[default]
    Adaptive,
}

/// Compute the ordered candidate list for a task kind.
///
/// `pin` is the adaptive per-kind engine override; `explicit_order` is the
/// configured fallback order, honoured only by the non-adaptive
/// strategies. Both are validated against the registry at router
/// construction, so here an entry that is down is simply skipped.
pub fn select(
    kind: TaskKind,
    strategy: Strategy,
    registry: &EngineRegistry,
    snapshot: &HashMap<EngineId, EngineStats>,
    pin: Option<&EngineId>,
    explicit_order: Option<&[EngineId]>,
) -> RouterResult<Vec<EngineId>> {
    let candidates: Vec<&RegisteredEngine> = registry
        .by_kind(kind)
        .into_iter()
        .filter(|e| e.available)
        .collect();

    if candidates.is_empty() {
        return Err(RouterError::EngineUnavailable { kind });
    }

    let order = match strategy {
        Strategy::OfflineFirst => {
            explicit_or_locality(&candidates, explicit_order, Locality::Local)
        }
        Strategy::OnlineFirst => {
            explicit_or_locality(&candidates, explicit_order, Locality::Remote)
        }
        Strategy::Adaptive => rank_adaptive(&candidates, snapshot, pin),
    };

    if order.is_empty() {
        return Err(RouterError::EngineUnavailable { kind });
    }
    debug!(%kind, ?strategy, candidates = ?order, "candidate order computed");
    Ok(order)
}

/// For the non-adaptive strategies: a configured fallback order replaces
/// the computed one, restricted to capable and available engines. Without
/// one, group by locality, keeping registration order within each group.
fn explicit_or_locality(
    candidates: &[&RegisteredEngine],
    explicit_order: Option<&[EngineId]>,
    first: Locality,
) -> Vec<EngineId> {
    if let Some(order) = explicit_order {
        return order
            .iter()
            .filter(|id| candidates.iter().any(|e| e.id() == *id))
            .cloned()
            .collect();
    }

    let preferred = candidates
        .iter()
        .filter(|e| e.descriptor.locality == first)
        .map(|e| e.id().clone());
    let rest = candidates
        .iter()
        .filter(|e| e.descriptor.locality != first)
        .map(|e| e.id().clone());
    preferred.chain(rest).collect()
}

/// Adaptive ranking: the pinned engine first, then engines with at least
/// one latency sample ordered by ascending average, then engines with no
/// samples in registration order. An untested engine must not look fast
/// just because nothing has been recorded for it.
fn rank_adaptive(
    candidates: &[&RegisteredEngine],
    snapshot: &HashMap<EngineId, EngineStats>,
    pin: Option<&EngineId>,
) -> Vec<EngineId> {
    let pinned: Option<EngineId> = pin
        .filter(|id| candidates.iter().any(|e| e.id() == *id))
        .cloned();

    let mut ranked: Vec<&&RegisteredEngine> = candidates
        .iter()
        .filter(|e| Some(e.id()) != pinned.as_ref())
        .collect();

    // Stable sort: ties and the unsampled group keep registration order.
    ranked.sort_by(|a, b| {
        let key_a = latency_key(snapshot, a.id());
        let key_b = latency_key(snapshot, b.id());
        key_a
            .partial_cmp(&key_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    pinned
        .into_iter()
        .chain(ranked.into_iter().map(|e| e.id().clone()))
        .collect()
}

/// Sort key: sampled engines in group 0 ordered by average latency,
/// unsampled engines in group 1.
fn latency_key(snapshot: &HashMap<EngineId, EngineStats>, id: &EngineId) -> (u8, f64) {
    match snapshot.get(id).and_then(|s| s.avg_latency_ms) {
        Some(avg) => (0, avg),
        None => (1, 0.0),
    }
}
