//! Core error types for nodesim-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of node tree editing.

use thiserror::Error;

use crate::id::NodeId;
use crate::value::SocketType;

/// Core errors produced by the nodesim-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node identifier was not found in the tree.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// Inserting a node whose identifier is already taken.
    #[error("duplicate node id: NodeId({id})")]
    DuplicateNodeId { id: NodeId },

    /// The node exists but is not of the kind the operation needs.
    #[error("node {id} is not a {expected} node")]
    WrongNodeKind { id: NodeId, expected: &'static str },

    /// Identifier `0` is reserved for "no node".
    #[error("node id 0 is reserved")]
    ReservedNodeId,

    /// A node does not declare a socket with the given name.
    #[error("node {node} has no {direction} socket '{socket}'")]
    SocketNotFound {
        node: NodeId,
        socket: String,
        direction: &'static str,
    },

    /// Linking two sockets of incompatible types.
    #[error("cannot link {from} output to {to} input")]
    SocketTypeMismatch { from: SocketType, to: SocketType },

    /// An input socket accepts a single link.
    #[error("input '{socket}' of node {node} is already linked")]
    InputAlreadyLinked { node: NodeId, socket: String },

    /// A link would connect a node to itself.
    #[error("node {node} cannot be linked to itself")]
    SelfLink { node: NodeId },
}
