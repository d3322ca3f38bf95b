//! Node bodies.
//!
//! Each body is a plain function over [`LazyEvaluationParams`] plus the
//! [`NodeExecContext`] describing where and when it runs. Bodies hold no
//! state between invocations; everything they need is re-read from the
//! params, the cache store, or the time source.
//!
//! [`LazyEvaluationParams`]: crate::params::LazyEvaluationParams

pub mod basic;
pub mod group;
pub mod simulation_input;
pub mod simulation_output;

use nodesim_cache::CacheStore;
use nodesim_core::{ComputeContext, GeometrySet, NodeId};

use crate::scene::TimeSource;

/// Values the enclosing group or repeat hands to a nested tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupInputs {
    pub geometry: GeometrySet,
    /// Zero-based repeat iteration; `0` outside repeats.
    pub iteration: u32,
}

/// Everything a body may consult besides its params.
pub struct NodeExecContext<'a> {
    pub node: NodeId,
    pub compute_context: &'a ComputeContext<'a>,
    pub cache: &'a dyn CacheStore<GeometrySet>,
    pub time: &'a dyn TimeSource,
    pub group_inputs: &'a GroupInputs,
}
