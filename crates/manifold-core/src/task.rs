//! Task model and content fingerprinting.
//!
//! A [`Task`] is the unit of work the router accepts: a task class, an
//! opaque payload, and free-form key/value options. The fingerprint over
//! those three fields is the cache key, so option iteration is normalized
//! (a `BTreeMap` keeps keys sorted) and field boundaries are
//! length-prefixed before hashing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::EngineId;

/// The class of work a task represents.
///
/// Used to filter engines by capability and to key per-class
/// configuration (strategy overrides, pins, fallback orders).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum TaskKind {
    /// Free-form text generation (chat, completion)
    Text,
    /// Code generation and completion
    Code,
    /// Image generation
    Image,
    /// Document analysis and processing
    Document,
    /// Web or knowledge-base search
    Search,
}

impl TaskKind {
    /// Stable wire tag, used in fingerprints and configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Image => "image",
            Self::Document => "document",
            Self::Search => "search",
        }
    }

    /// Parse a task kind from a human-readable string.
    ///
    /// Returns `None` for unrecognised strings.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "chat" | "completion" => Some(Self::Text),
            "code" | "program" | "completion-code" => Some(Self::Code),
            "image" | "picture" | "art" => Some(Self::Image),
            "document" | "doc" | "pdf" => Some(Self::Document),
            "search" | "web-search" | "lookup" => Some(Self::Search),
            _ => None,
        }
    }

    /// Best-effort classification of a payload whose kind the caller does
    /// not know. Purely advisory: the router never calls this implicitly.
    pub fn detect(payload: &str) -> Self {
        let lower = payload.to_lowercase();

        if lower.contains(".pdf") || lower.contains(".docx") || lower.contains("document") {
            return Self::Document;
        }
        if lower.contains("```")
            || lower.contains("fn ")
            || lower.contains("function")
            || lower.contains("class ")
        {
            return Self::Code;
        }
        if lower.contains("image") || lower.contains("picture") || lower.contains("draw ") {
            return Self::Image;
        }
        if lower.contains("search") || lower.contains("look up") || lower.contains("find information")
        {
            return Self::Search;
        }

        Self::Text
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work submitted to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The task class, driving engine selection.
    pub kind: TaskKind,
    /// Opaque payload handed verbatim to the executing engine.
    pub payload: String,
    /// Free-form key/value options. Sorted iteration keeps fingerprints
    /// deterministic regardless of insertion order.
    pub options: BTreeMap<String, String>,
    /// When set, this engine is tried first, bypassing the selector's
    /// ranking. Not part of the fingerprint.
    pub preferred_engine: Option<EngineId>,
}

impl Task {
    /// Create a task with no options and no engine preference.
    pub fn new(kind: TaskKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            options: BTreeMap::new(),
            preferred_engine: None,
        }
    }

    /// Add a single option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Pin the first execution attempt to a specific engine.
    pub fn with_preferred_engine(mut self, id: impl Into<EngineId>) -> Self {
        self.preferred_engine = Some(id.into());
        self
    }

    /// Compute the deterministic content fingerprint of this task.
    ///
    /// Covers kind, payload, and options. The engine preference is routing
    /// advice, not content, and is excluded.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, self.kind.as_str().as_bytes());
        hash_field(&mut hasher, self.payload.as_bytes());
        for (key, value) in &self.options {
            hash_field(&mut hasher, key.as_bytes());
            hash_field(&mut hasher, value.as_bytes());
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

/// Length-prefix each field so adjacent fields cannot collide
/// ("ab" + "c" must not hash like "a" + "bc").
fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// A deterministic hash of a task's content, used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
