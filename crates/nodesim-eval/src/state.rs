//! Demand-driven evaluator with cooperative suspension.
//!
//! The [`Evaluator`] computes requested output sockets of a [`NodeTree`]
//! with a work-stack algorithm:
//!
//! - The node on top of the stack is invoked with the outputs still
//!   missing for it. Its inputs are whatever upstream values have been
//!   collected so far.
//! - A body that answers `Pending` on some inputs suspends. The linked
//!   upstream outputs become required and their nodes are pushed. Unlinked
//!   inputs resolve to the socket default at once.
//! - A body that returns without pending inputs completes. Required
//!   outputs it left unset are filled with socket defaults and the node is
//!   popped. A later consumer requiring another of its outputs pushes it
//!   again and it re-runs for just that output.
//!
//! Group and repeat nodes evaluate their nested tree through the same
//! evaluator under a child [`ComputeContext`], so a simulation nested
//! inside them gets one cache bucket per call site and per iteration.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use nodesim_cache::CacheStore;
use nodesim_core::{socket, ComputeContext, CoreError, GeometrySet, Node, NodeId, NodeKind, NodeTree, SocketValue};

use crate::error::EvalError;
use crate::nodes::{basic, group, simulation_input, simulation_output, GroupInputs, NodeExecContext};
use crate::params::ExecParams;
use crate::scene::TimeSource;
use crate::session::EvaluationSession;
use crate::trace::{TraceEntry, TraceOutcome};

/// Configuration for the evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Whether to record a [`TraceEntry`] per body invocation.
    pub trace_enabled: bool,
    /// Invocations allowed per node within one tree evaluation. Default: 64.
    pub max_invocations_per_node: u32,
    /// Maximum group/repeat nesting. Default: 64.
    pub max_nesting_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            trace_enabled: false,
            max_invocations_per_node: 64,
            max_nesting_depth: 64,
        }
    }
}

/// An output socket of a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SocketRef {
    pub node: NodeId,
    pub socket: String,
}

/// Requested outputs in request order.
pub type EvaluatedOutputs = IndexMap<SocketRef, SocketValue>;

/// Per-node bookkeeping within one tree evaluation.
#[derive(Debug, Default)]
struct NodeState {
    /// Outputs some consumer asked for.
    required: IndexSet<String>,
    /// Inputs ready to hand to the body.
    inputs: HashMap<String, SocketValue>,
    /// Inputs waiting on an upstream node still on the stack.
    awaiting: IndexSet<String>,
    /// Outputs produced so far.
    outputs: IndexMap<String, SocketValue>,
    invocations: u32,
}

/// Evaluates node trees for one point in time against one cache store.
pub struct Evaluator<'s> {
    cache: &'s dyn CacheStore<GeometrySet>,
    time: &'s dyn TimeSource,
    config: EvaluatorConfig,
    trace: Vec<TraceEntry>,
}

impl<'s> Evaluator<'s> {
    pub fn new(
        cache: &'s dyn CacheStore<GeometrySet>,
        time: &'s dyn TimeSource,
        config: EvaluatorConfig,
    ) -> Self {
        Evaluator {
            cache,
            time,
            config,
            trace: Vec::new(),
        }
    }

    /// An evaluator reading and writing the session's caches.
    pub fn for_session(
        session: &'s EvaluationSession,
        time: &'s dyn TimeSource,
        config: EvaluatorConfig,
    ) -> Self {
        Self::new(session.caches(), time, config)
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.trace)
    }

    /// Evaluates the requested `(node, output socket)` pairs of a top-level tree.
    pub fn evaluate(
        &mut self,
        tree: &NodeTree,
        context: &ComputeContext<'_>,
        request: &[(NodeId, &str)],
    ) -> Result<EvaluatedOutputs, EvalError> {
        self.evaluate_with_inputs(tree, context, &GroupInputs::default(), request)
    }

    /// Like [`Evaluator::evaluate`], with explicit values for `GroupInput` nodes.
    pub fn evaluate_with_inputs(
        &mut self,
        tree: &NodeTree,
        context: &ComputeContext<'_>,
        group_inputs: &GroupInputs,
        request: &[(NodeId, &str)],
    ) -> Result<EvaluatedOutputs, EvalError> {
        self.evaluate_at_depth(tree, context, group_inputs, request, 0)
    }

    /// Evaluates the Geometry reaching the `GroupOutput` of a nested tree.
    pub(crate) fn evaluate_nested(
        &mut self,
        owner: NodeId,
        tree: &NodeTree,
        context: &ComputeContext<'_>,
        group_inputs: &GroupInputs,
        depth: usize,
    ) -> Result<GeometrySet, EvalError> {
        if depth > self.config.max_nesting_depth {
            return Err(EvalError::NestingTooDeep {
                node: owner,
                limit: self.config.max_nesting_depth,
            });
        }
        let output = tree
            .nodes()
            .find(|node| matches!(node.kind, NodeKind::GroupOutput))
            .ok_or(EvalError::MissingGroupOutput { node: owner })?;
        let Some((from, from_socket)) = tree.input_link(output.id, socket::GEOMETRY) else {
            return Ok(GeometrySet::default());
        };

        let results = self.evaluate_at_depth(tree, context, group_inputs, &[(from, from_socket)], depth)?;
        match results.into_values().next() {
            Some(SocketValue::Geometry(geometry)) => Ok(geometry),
            Some(other) => Err(EvalError::TypeMismatch {
                node: from,
                socket: from_socket.to_string(),
                expected: nodesim_core::SocketType::Geometry,
                got: other.socket_type(),
            }),
            None => Err(EvalError::MissingGroupOutput { node: owner }),
        }
    }

    fn evaluate_at_depth(
        &mut self,
        tree: &NodeTree,
        context: &ComputeContext<'_>,
        group_inputs: &GroupInputs,
        request: &[(NodeId, &str)],
        depth: usize,
    ) -> Result<EvaluatedOutputs, EvalError> {
        let mut states: HashMap<NodeId, NodeState> = HashMap::new();
        let mut stack: Vec<NodeId> = Vec::new();

        for &(node_id, output) in request {
            let node = tree.node(node_id).ok_or(CoreError::NodeNotFound { id: node_id })?;
            if node.kind.output(output).is_none() {
                return Err(EvalError::UnknownSocket {
                    node: node_id,
                    socket: output.to_string(),
                    direction: "output",
                });
            }
            states
                .entry(node_id)
                .or_default()
                .required
                .insert(output.to_string());
            if !stack.contains(&node_id) {
                stack.push(node_id);
            }
        }

        while let Some(&node_id) = stack.last() {
            let node = tree.node(node_id).ok_or(CoreError::NodeNotFound { id: node_id })?;
            collect_ready_inputs(tree, node_id, &mut states);

            let state = states.entry(node_id).or_default();
            let missing: Vec<String> = state
                .required
                .iter()
                .filter(|output| !state.outputs.contains_key(output.as_str()))
                .cloned()
                .collect();
            if missing.is_empty() {
                stack.pop();
                continue;
            }

            state.invocations += 1;
            if state.invocations > self.config.max_invocations_per_node {
                return Err(EvalError::NoProgress {
                    node: node_id,
                    invocations: self.config.max_invocations_per_node,
                });
            }
            let invocation = state.invocations;
            let mut params = ExecParams::new(node_id, state.inputs.clone(), missing.iter().cloned());

            self.run_body(node, &mut params, context, group_inputs, depth)?;
            let outcome = params.finish();

            if self.config.trace_enabled {
                let trace_outcome = if outcome.is_suspended() {
                    TraceOutcome::Suspended {
                        pending: outcome.pending.iter().cloned().collect(),
                    }
                } else {
                    TraceOutcome::Completed {
                        published: outcome.outputs.keys().cloned().collect(),
                    }
                };
                self.trace
                    .push(TraceEntry::new(node_id, context.hash(), invocation, trace_outcome));
            }

            if outcome.is_suspended() {
                if !outcome.outputs.is_empty() {
                    return Err(EvalError::PublishedWhileSuspended { node: node_id });
                }
                debug!(node = %node_id, pending = ?outcome.pending, "node suspended");
                schedule_inputs(tree, node, outcome.pending, &mut states, &mut stack)?;
                continue;
            }

            let state = states.entry(node_id).or_default();
            for (name, value) in outcome.outputs {
                let decl = node.kind.output(&name).ok_or_else(|| EvalError::UnknownSocket {
                    node: node_id,
                    socket: name.clone(),
                    direction: "output",
                })?;
                if decl.socket_type != value.socket_type() {
                    return Err(EvalError::TypeMismatch {
                        node: node_id,
                        socket: name,
                        expected: decl.socket_type,
                        got: value.socket_type(),
                    });
                }
                state.outputs.insert(name, value);
            }
            for name in missing {
                if state.outputs.contains_key(&name) {
                    continue;
                }
                let decl = node.kind.output(&name).ok_or_else(|| EvalError::UnknownSocket {
                    node: node_id,
                    socket: name.clone(),
                    direction: "output",
                })?;
                debug!(node = %node_id, output = %name, "output left unset; using default");
                state.outputs.insert(name, decl.socket_type.default_value());
            }
            stack.pop();
        }

        let mut results = EvaluatedOutputs::new();
        for &(node_id, output) in request {
            let value = states
                .get(&node_id)
                .and_then(|state| state.outputs.get(output))
                .cloned()
                .ok_or(EvalError::NoProgress {
                    node: node_id,
                    invocations: 0,
                })?;
            results.insert(
                SocketRef {
                    node: node_id,
                    socket: output.to_string(),
                },
                value,
            );
        }
        Ok(results)
    }

    fn run_body(
        &mut self,
        node: &Node,
        params: &mut ExecParams,
        context: &ComputeContext<'_>,
        group_inputs: &GroupInputs,
        depth: usize,
    ) -> Result<(), EvalError> {
        let ctx = NodeExecContext {
            node: node.id,
            compute_context: context,
            cache: self.cache,
            time: self.time,
            group_inputs,
        };
        match &node.kind {
            NodeKind::SimulationInput(config) => {
                let state = simulation_input::execute(config, params, &ctx)?;
                debug!(node = %node.id, ?state, suspended = params.is_suspended(), "simulation input visited");
            }
            NodeKind::SimulationOutput => {
                let state = simulation_output::execute(params, &ctx)?;
                debug!(node = %node.id, ?state, "simulation output visited");
            }
            NodeKind::Group { tree } => {
                group::execute_group(self, node.id, tree, params, context, depth)?;
            }
            NodeKind::Repeat { iterations, tree } => {
                group::execute_repeat(self, node.id, *iterations, tree, params, context, depth)?;
            }
            kind => {
                basic::execute(kind, params, group_inputs)?;
            }
        }
        Ok(())
    }
}

/// Moves finished upstream values into a node's inputs.
fn collect_ready_inputs(tree: &NodeTree, node_id: NodeId, states: &mut HashMap<NodeId, NodeState>) {
    let awaiting: Vec<String> = match states.get(&node_id) {
        Some(state) => state.awaiting.iter().cloned().collect(),
        None => return,
    };
    for input in awaiting {
        let Some((upstream, upstream_socket)) = tree.input_link(node_id, &input) else {
            continue;
        };
        let value = states
            .get(&upstream)
            .and_then(|state| state.outputs.get(upstream_socket))
            .cloned();
        if let Some(value) = value {
            let state = states.entry(node_id).or_default();
            state.awaiting.shift_remove(&input);
            state.inputs.insert(input, value);
        }
    }
}

/// Resolves the inputs a suspended node is waiting on.
///
/// A node on the stack that is itself awaiting inputs is an ancestor of the
/// suspended node in the wait chain, so requiring its output is a cycle.
fn schedule_inputs(
    tree: &NodeTree,
    node: &Node,
    pending: IndexSet<String>,
    states: &mut HashMap<NodeId, NodeState>,
    stack: &mut Vec<NodeId>,
) -> Result<(), EvalError> {
    let mut pushed: Vec<NodeId> = Vec::new();
    for input in pending {
        let decl = node.kind.input(&input).ok_or_else(|| EvalError::UnknownSocket {
            node: node.id,
            socket: input.clone(),
            direction: "input",
        })?;

        let Some((upstream, upstream_socket)) = tree.input_link(node.id, &input) else {
            states
                .entry(node.id)
                .or_default()
                .inputs
                .insert(input, decl.socket_type.default_value());
            continue;
        };

        let upstream_state = states.entry(upstream).or_default();
        if let Some(value) = upstream_state.outputs.get(upstream_socket) {
            let value = value.clone();
            states.entry(node.id).or_default().inputs.insert(input, value);
            continue;
        }
        let upstream_waiting = !upstream_state.awaiting.is_empty();
        upstream_state.required.insert(upstream_socket.to_string());
        states.entry(node.id).or_default().awaiting.insert(input);

        if pushed.contains(&upstream) {
            continue;
        }
        if upstream_waiting && stack.contains(&upstream) {
            return Err(EvalError::CycleDetected { node: upstream });
        }
        stack.push(upstream);
        pushed.push(upstream);
    }
    Ok(())
}
