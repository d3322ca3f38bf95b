//! The pull contract between a node body and the lazy evaluator.
//!
//! A body is invoked with a [`LazyEvaluationParams`] describing which of its
//! outputs are currently required and which inputs are already available.
//! It asks for inputs with [`LazyEvaluationParams::lazy_require_input`]; any
//! `Pending` answer means the body must return without publishing anything.
//! The evaluator then schedules the upstream nodes and re-invokes the body
//! from the top once the inputs are ready. No continuation is kept between
//! invocations, so bodies re-derive their state on every run.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::{trace, warn};

use nodesim_core::{GeometrySet, NodeId, SocketType, SocketValue};

use crate::error::EvalError;

/// Availability of a requested input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// The value can be extracted now.
    Ready,
    /// The value is being computed; the body must return and wait.
    Pending,
}

impl InputStatus {
    pub fn is_pending(self) -> bool {
        self == InputStatus::Pending
    }
}

/// What a node body sees of the evaluator during one invocation.
pub trait LazyEvaluationParams {
    /// The node being executed.
    fn node(&self) -> NodeId;

    /// Whether some consumer needs this output. Never blocks.
    fn lazy_output_is_required(&self, output: &str) -> bool;

    /// Publishes an output. Call at most once per output per invocation.
    fn set_output(&mut self, output: &str, value: SocketValue);

    /// Declares that the body needs `input` and reports whether it is ready.
    fn lazy_require_input(&mut self, input: &str) -> InputStatus;

    /// Takes an input previously reported [`InputStatus::Ready`].
    fn extract_input(&mut self, input: &str) -> Result<SocketValue, EvalError>;

    fn extract_geometry(&mut self, input: &str) -> Result<GeometrySet, EvalError> {
        match self.extract_input(input)? {
            SocketValue::Geometry(geometry) => Ok(geometry),
            other => Err(EvalError::TypeMismatch {
                node: self.node(),
                socket: input.to_string(),
                expected: SocketType::Geometry,
                got: other.socket_type(),
            }),
        }
    }

    fn extract_float(&mut self, input: &str) -> Result<f32, EvalError> {
        match self.extract_input(input)? {
            SocketValue::Float(value) => Ok(value),
            other => Err(EvalError::TypeMismatch {
                node: self.node(),
                socket: input.to_string(),
                expected: SocketType::Float,
                got: other.socket_type(),
            }),
        }
    }
}

/// Result of one body invocation.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    /// Outputs published, in publication order.
    pub outputs: IndexMap<String, SocketValue>,
    /// Inputs the body is waiting on.
    pub pending: IndexSet<String>,
}

impl ExecOutcome {
    pub fn is_suspended(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// The evaluator's [`LazyEvaluationParams`] for a single invocation.
#[derive(Debug)]
pub struct ExecParams {
    node: NodeId,
    inputs: HashMap<String, SocketValue>,
    required_outputs: HashSet<String>,
    requested_inputs: IndexSet<String>,
    outcome: ExecOutcome,
}

impl ExecParams {
    pub fn new<I, S>(node: NodeId, inputs: HashMap<String, SocketValue>, required_outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExecParams {
            node,
            inputs,
            required_outputs: required_outputs.into_iter().map(Into::into).collect(),
            requested_inputs: IndexSet::new(),
            outcome: ExecOutcome::default(),
        }
    }

    /// Makes an input available to the body.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<SocketValue>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Every input the body asked for, ready or not.
    pub fn requested_inputs(&self) -> &IndexSet<String> {
        &self.requested_inputs
    }

    pub fn output(&self, name: &str) -> Option<&SocketValue> {
        self.outcome.outputs.get(name)
    }

    pub fn published(&self) -> impl Iterator<Item = &str> + '_ {
        self.outcome.outputs.keys().map(String::as_str)
    }

    pub fn is_suspended(&self) -> bool {
        self.outcome.is_suspended()
    }

    pub fn finish(self) -> ExecOutcome {
        self.outcome
    }
}

impl LazyEvaluationParams for ExecParams {
    fn node(&self) -> NodeId {
        self.node
    }

    fn lazy_output_is_required(&self, output: &str) -> bool {
        self.required_outputs.contains(output)
    }

    fn set_output(&mut self, output: &str, value: SocketValue) {
        if !self.required_outputs.contains(output) {
            trace!(node = %self.node, output, "publishing an output nobody requested");
        }
        if self
            .outcome
            .outputs
            .insert(output.to_string(), value)
            .is_some()
        {
            warn!(node = %self.node, output, "output published twice in one invocation");
        }
    }

    fn lazy_require_input(&mut self, input: &str) -> InputStatus {
        self.requested_inputs.insert(input.to_string());
        if self.inputs.contains_key(input) {
            InputStatus::Ready
        } else {
            self.outcome.pending.insert(input.to_string());
            InputStatus::Pending
        }
    }

    fn extract_input(&mut self, input: &str) -> Result<SocketValue, EvalError> {
        self.inputs
            .remove(input)
            .ok_or_else(|| EvalError::MissingInput {
                node: self.node,
                socket: input.to_string(),
            })
    }
}
