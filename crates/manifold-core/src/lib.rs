//! Manifold: task routing and orchestration across heterogeneous
//! execution engines.
//!
//! A [`router::Router`] accepts a [`task::Task`], picks among registered
//! engines by capability and strategy, walks a fallback chain on failure,
//! caches results by content fingerprint, and tracks per-engine
//! performance that feeds back into adaptive selection.
//!
//! Engines are opaque: anything implementing [`engine::Engine`] can be
//! registered, local or remote.
//!
//! # Example
//!
//! ```rust,ignore
//! use manifold_core::{
//!     Engine, EngineDescriptor, EngineRegistry, Locality, Router,
//!     RouterConfig, Task, TaskKind,
//! };
//!
//! let mut registry = EngineRegistry::new();
//! registry.register(
//!     EngineDescriptor::new("local-llm", "Local LLM", Locality::Local, vec![TaskKind::Text]),
//!     Arc::new(MyLocalEngine::default()),
//! ).await?;
//!
//! let router = Router::new(registry, RouterConfig::default())?;
//! let outcome = router.handle(&Task::new(TaskKind::Text, "hello")).await?;
//! ```

// task model and content fingerprinting
pub mod task;

// engine execution contract
pub mod engine;

// error taxonomy
pub mod error;

// engine registry
pub mod registry;

// candidate selection strategies
pub mod selector;

// sequential fallback execution
pub mod fallback;

// fingerprint-keyed result cache
pub mod cache;

// per-engine performance metrics
pub mod metrics;

// configuration parsing and validation
pub mod config;

// router facade
pub mod router;

// Re-export the public surface
pub use cache::{CachedResult, ResultCache};
pub use config::{CacheConfig, RouterConfig};
pub use engine::{
    Engine, EngineDescriptor, EngineError, EngineId, EngineResult, Locality,
};
pub use error::{CacheFault, EngineFailure, RouterError, RouterResult};
pub use fallback::FallbackSuccess;
pub use metrics::{EngineStats, MetricsCollector, LATENCY_WINDOW};
pub use registry::{EngineRegistry, RegisteredEngine};
pub use router::{CacheStats, EngineAvailability, RouteOutcome, Router, RouterStats};
pub use selector::Strategy;
pub use task::{Fingerprint, Task, TaskKind};
