//! End-to-end router scenarios against mock engines.

use std::sync::Arc;
use std::time::Duration;

use manifold_core::{
    Engine, EngineId, EngineRegistry, Locality, Router, RouterConfig, RouterError, Task, TaskKind,
};
use manifold_testing::{FailingEngine, ScriptedEngine, SlowEngine, UnavailableEngine, descriptor};

async fn register(
    registry: &mut EngineRegistry,
    id: &str,
    locality: Locality,
    kinds: Vec<TaskKind>,
    engine: Arc<dyn Engine>,
) {
    registry
        .register(descriptor(id, locality, kinds), engine)
        .await
        .unwrap();
}

#[tokio::test]
async fn text_task_falls_back_to_local_and_is_cached_on_repeat() {
    // Remote engine is down at the wire level, local engine answers "X".
    let online = FailingEngine::timing_out("connection reset");
    let local = ScriptedEngine::new("X");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "online",
        Locality::Remote,
        vec![TaskKind::Text],
        online.clone(),
    )
    .await;
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();
    let task = Task::new(TaskKind::Text, "hello");

    let first = router.handle(&task).await.unwrap();
    assert_eq!(first.result, "X");
    assert_eq!(first.engine.as_str(), "local");
    assert!(!first.cached);

    let second = router.handle(&task).await.unwrap();
    assert_eq!(second.result, "X");
    assert_eq!(second.engine.as_str(), "local");
    assert!(second.cached);
    assert_eq!(second.response_time_ms, 0);

    // Each engine ran exactly once; the cache hit touched neither.
    assert_eq!(online.call_count(), 1);
    assert_eq!(local.call_count(), 1);
    let snapshot = router.metrics_snapshot();
    assert_eq!(snapshot[&EngineId::new("local")].invocations, 1);
}

#[tokio::test]
async fn fallback_walks_candidates_in_order() {
    let a = FailingEngine::timing_out("a is slow");
    let b = FailingEngine::broken("b crashed");
    let c = ScriptedEngine::new("from c");

    let mut registry = EngineRegistry::new();
    register(&mut registry, "a", Locality::Local, vec![TaskKind::Code], a.clone()).await;
    register(&mut registry, "b", Locality::Local, vec![TaskKind::Code], b.clone()).await;
    register(&mut registry, "c", Locality::Local, vec![TaskKind::Code], c.clone()).await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();
    let outcome = router
        .handle(&Task::new(TaskKind::Code, "write a parser"))
        .await
        .unwrap();

    assert_eq!(outcome.engine.as_str(), "c");
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);

    let snapshot = router.metrics_snapshot();
    assert_eq!(snapshot[&EngineId::new("a")].failures, 1);
    assert_eq!(snapshot[&EngineId::new("b")].failures, 1);
    assert_eq!(snapshot[&EngineId::new("c")].successes, 1);
}

#[tokio::test]
async fn exhaustion_reports_each_engine_with_its_own_reason() {
    let a = FailingEngine::timing_out("no response after 30s");
    let b = FailingEngine::broken("model crashed");
    let c = FailingEngine::broken("out of credits");

    let mut registry = EngineRegistry::new();
    register(&mut registry, "a", Locality::Local, vec![TaskKind::Text], a).await;
    register(&mut registry, "b", Locality::Local, vec![TaskKind::Text], b).await;
    register(&mut registry, "c", Locality::Remote, vec![TaskKind::Text], c).await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();
    let err = router
        .handle(&Task::new(TaskKind::Text, "hello"))
        .await
        .unwrap_err();

    match err {
        RouterError::AllEnginesExhausted { kind, failures } => {
            assert_eq!(kind, TaskKind::Text);
            assert_eq!(failures.len(), 3);
            let ids: Vec<&str> = failures.iter().map(|f| f.engine.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert!(failures[0].reason.contains("no response after 30s"));
            assert!(failures[1].reason.contains("model crashed"));
            assert!(failures[2].reason.contains("out of credits"));
        }
        other => panic!("expected AllEnginesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_engine_is_never_executed() {
    let dead = UnavailableEngine::new();
    let live = ScriptedEngine::new("ok");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "dead",
        Locality::Local,
        vec![TaskKind::Text],
        dead.clone(),
    )
    .await;
    register(
        &mut registry,
        "live",
        Locality::Remote,
        vec![TaskKind::Text],
        live.clone(),
    )
    .await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();
    for i in 0..3 {
        let outcome = router
            .handle(&Task::new(TaskKind::Text, format!("payload {i}")))
            .await
            .unwrap();
        assert_eq!(outcome.engine.as_str(), "live");
    }
    assert_eq!(dead.call_count(), 0);

    // The dead engine still shows up in diagnostics.
    let stats = router.stats();
    let entry = stats.engines.iter().find(|e| e.id.as_str() == "dead").unwrap();
    assert!(!entry.available);
}

#[tokio::test]
async fn only_unavailable_candidates_is_reported_as_unavailable() {
    let dead = UnavailableEngine::new();

    let mut registry = EngineRegistry::new();
    register(&mut registry, "dead", Locality::Local, vec![TaskKind::Image], dead).await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();
    let err = router
        .handle(&Task::new(TaskKind::Image, "draw a cat"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouterError::EngineUnavailable {
            kind: TaskKind::Image
        }
    ));
}

#[tokio::test]
async fn adaptive_ranking_shifts_with_observed_latency() {
    // Registered first, so it wins the tie while both engines are unmeasured.
    let tortoise = SlowEngine::new(Duration::from_millis(80), "slow answer");
    let hare = SlowEngine::new(Duration::from_millis(5), "fast answer");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "tortoise",
        Locality::Local,
        vec![TaskKind::Text],
        tortoise.clone(),
    )
    .await;
    register(
        &mut registry,
        "hare",
        Locality::Local,
        vec![TaskKind::Text],
        hare.clone(),
    )
    .await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();

    let first = router
        .handle(&Task::new(TaskKind::Text, "alpha"))
        .await
        .unwrap();
    assert_eq!(first.engine.as_str(), "tortoise");

    // Give the hare a measured sample by forcing one execution through it.
    let forced = router
        .handle(&Task::new(TaskKind::Text, "beta").with_preferred_engine("hare"))
        .await
        .unwrap();
    assert_eq!(forced.engine.as_str(), "hare");

    // With both measured, the hare's lower average now ranks it first.
    let third = router
        .handle(&Task::new(TaskKind::Text, "gamma"))
        .await
        .unwrap();
    assert_eq!(third.engine.as_str(), "hare");
    assert_eq!(tortoise.call_count(), 1);
}

#[tokio::test]
async fn lru_entry_is_evicted_once_capacity_is_reached() {
    let local = ScriptedEngine::new("ok");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;

    let mut config = RouterConfig::default();
    config.cache.max_entries = 2;
    let router = Router::new(registry, config).unwrap();

    let first = Task::new(TaskKind::Text, "first");
    let second = Task::new(TaskKind::Text, "second");
    let third = Task::new(TaskKind::Text, "third");

    router.handle(&first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    router.handle(&second).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    // Inserting the third entry evicts "first", the least recently used.
    router.handle(&third).await.unwrap();

    assert!(router.handle(&third).await.unwrap().cached);
    assert!(router.handle(&second).await.unwrap().cached);
    assert!(!router.handle(&first).await.unwrap().cached);
    assert_eq!(local.call_count(), 4);
}

#[tokio::test]
async fn zero_ttl_expires_entries_immediately() {
    let local = ScriptedEngine::new("ok");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;

    let mut config = RouterConfig::default();
    config.cache.ttl_secs = 0;
    let router = Router::new(registry, config).unwrap();

    let task = Task::new(TaskKind::Text, "hello");
    router.handle(&task).await.unwrap();
    let second = router.handle(&task).await.unwrap();
    assert!(!second.cached);
    assert_eq!(local.call_count(), 2);
}

#[tokio::test]
async fn explicit_fallback_order_overrides_locality_grouping() {
    let local = ScriptedEngine::new("from local");
    let cloud = ScriptedEngine::new("from cloud");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;
    register(
        &mut registry,
        "cloud",
        Locality::Remote,
        vec![TaskKind::Text],
        cloud.clone(),
    )
    .await;

    let config = RouterConfig::from_yaml_str(
        r#"
strategy: offline-first
fallback_orders:
  text: [cloud, local]
"#,
    )
    .unwrap();
    let router = Router::new(registry, config).unwrap();

    let outcome = router
        .handle(&Task::new(TaskKind::Text, "hello"))
        .await
        .unwrap();
    assert_eq!(outcome.engine.as_str(), "cloud");
    assert_eq!(local.call_count(), 0);
}

#[tokio::test]
async fn adaptive_pin_routes_the_kind_to_the_pinned_engine() -> anyhow::Result<()> {
    let generalist = ScriptedEngine::new("from generalist");
    let specialist = ScriptedEngine::new("from specialist");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "generalist",
        Locality::Local,
        vec![TaskKind::Text, TaskKind::Code],
        generalist.clone(),
    )
    .await;
    register(
        &mut registry,
        "specialist",
        Locality::Remote,
        vec![TaskKind::Code],
        specialist.clone(),
    )
    .await;

    let config = RouterConfig::from_yaml_str(
        r#"
strategy: adaptive
pins:
  code: specialist
"#,
    )?;
    let router = Router::new(registry, config)?;

    let code = router.handle(&Task::new(TaskKind::Code, "refactor this")).await?;
    assert_eq!(code.engine.as_str(), "specialist");

    let text = router.handle(&Task::new(TaskKind::Text, "say hi")).await?;
    assert_eq!(text.engine.as_str(), "generalist");
    Ok(())
}

#[tokio::test]
async fn options_are_part_of_the_cache_identity() {
    let local = ScriptedEngine::new("ok");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;

    let router = Router::new(registry, RouterConfig::default()).unwrap();

    let plain = Task::new(TaskKind::Text, "hello");
    let tuned = Task::new(TaskKind::Text, "hello").with_option("temperature", "0.9");

    router.handle(&plain).await.unwrap();
    let outcome = router.handle(&tuned).await.unwrap();
    assert!(!outcome.cached);
    assert_eq!(local.call_count(), 2);
}

#[tokio::test]
async fn stats_and_administrative_clears() -> anyhow::Result<()> {
    let local = ScriptedEngine::new("ok");

    let mut registry = EngineRegistry::new();
    register(
        &mut registry,
        "local",
        Locality::Local,
        vec![TaskKind::Text],
        local.clone(),
    )
    .await;

    let router = Router::new(registry, RouterConfig::default())?;
    let task = Task::new(TaskKind::Text, "hello");
    router.handle(&task).await?;
    router.handle(&task).await?;

    let stats = router.stats();
    assert_eq!(stats.cache.size, 1);
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 1);
    assert_eq!(stats.metrics[&EngineId::new("local")].invocations, 1);

    router.clear_cache();
    router.clear_metrics();

    let cleared = router.stats();
    assert_eq!(cleared.cache.size, 0);
    assert_eq!(cleared.cache.hits, 0);
    assert!(cleared.metrics.is_empty());
    Ok(())
}
