//! Evaluation error types.
//!
//! Cache misses, unbound simulation inputs and pending inputs are not
//! errors; they are ordinary evaluation states. [`EvalError`] covers broken
//! trees and node bodies that violate the pull contract. Every variant
//! names the node it concerns.

use nodesim_core::{CoreError, NodeId, SocketType};
use thiserror::Error;

/// Errors produced while evaluating a node tree.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("node {node}: input '{socket}' read before it was available")]
    MissingInput { node: NodeId, socket: String },

    #[error("node {node} has no {direction} socket '{socket}'")]
    UnknownSocket {
        node: NodeId,
        socket: String,
        direction: &'static str,
    },

    #[error("node {node}: socket '{socket}' expects {expected}, got {got}")]
    TypeMismatch {
        node: NodeId,
        socket: String,
        expected: SocketType,
        got: SocketType,
    },

    #[error("dependency cycle through node {node}")]
    CycleDetected { node: NodeId },

    #[error("node {node} made no progress after {invocations} invocations")]
    NoProgress { node: NodeId, invocations: u32 },

    #[error("node {node} published outputs while waiting for inputs")]
    PublishedWhileSuspended { node: NodeId },

    #[error("nested tree depth limit ({limit}) exceeded at node {node}")]
    NestingTooDeep { node: NodeId, limit: usize },

    #[error("nested tree of node {node} has no group output")]
    MissingGroupOutput { node: NodeId },

    #[error("node {node}: no body for {kind} nodes")]
    UnhandledKind { node: NodeId, kind: &'static str },
}
