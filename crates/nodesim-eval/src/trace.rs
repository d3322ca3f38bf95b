//! Execution trace recording for the evaluator.
//!
//! When tracing is enabled via [`EvaluatorConfig::trace_enabled`], the
//! evaluator records a [`TraceEntry`] for every node body invocation,
//! including invocations that suspended on pending inputs.
//!
//! [`EvaluatorConfig::trace_enabled`]: crate::state::EvaluatorConfig::trace_enabled

use nodesim_core::{ContextHash, NodeId};
use serde::Serialize;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Returned early waiting on these inputs.
    Suspended { pending: Vec<String> },
    /// Published these outputs (defaults filled in are not listed).
    Completed { published: Vec<String> },
}

/// A single body invocation.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub node: NodeId,
    /// Hex hash of the compute context the node ran in.
    pub context: String,
    /// 1-based invocation count of this node within its tree evaluation.
    pub invocation: u32,
    #[serde(flatten)]
    pub outcome: TraceOutcome,
}

impl TraceEntry {
    pub fn new(node: NodeId, context: ContextHash, invocation: u32, outcome: TraceOutcome) -> Self {
        TraceEntry {
            node,
            context: context.to_hex(),
            invocation,
            outcome,
        }
    }
}
