//! Evaluation sessions: the lifetime of a set of frame caches.
//!
//! A session owns the [`ComputeCacheRegistry`] that simulation nodes share
//! while one target (for example one object's node modifier) is evaluated
//! across a frame range. It is passed by reference into every evaluator, so
//! two sessions never see each other's caches. Topology changes upstream of
//! a simulation call [`EvaluationSession::invalidate`].

use nodesim_cache::ComputeCacheRegistry;
use nodesim_core::{ComputeContext, GeometrySet};
use tracing::info;

/// Frame caches and identity of one evaluation target.
#[derive(Debug)]
pub struct EvaluationSession {
    label: String,
    caches: ComputeCacheRegistry<GeometrySet>,
}

impl EvaluationSession {
    pub fn new(label: impl Into<String>) -> Self {
        EvaluationSession {
            label: label.into(),
            caches: ComputeCacheRegistry::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The root of every call path evaluated in this session.
    pub fn root_context(&self) -> ComputeContext<'static> {
        ComputeContext::root(self.label.clone())
    }

    pub fn caches(&self) -> &ComputeCacheRegistry<GeometrySet> {
        &self.caches
    }

    /// Discards all cached frames.
    pub fn invalidate(&self) {
        info!(session = %self.label, buckets = self.caches.len(), "invalidating simulation caches");
        self.caches.clear();
    }
}
