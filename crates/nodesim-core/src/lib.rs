//! Core data model for nodesim: node trees, socket values, and the compute
//! contexts that identify where in a call tree a node is evaluated.

pub mod context;
pub mod error;
pub mod id;
pub mod link;
pub mod node;
pub mod tree;
pub mod value;

// Re-export commonly used types
pub use context::{ComputeContext, ContextHash, ContextKind};
pub use error::CoreError;
pub use id::NodeId;
pub use link::Link;
pub use node::{socket, Node, NodeKind, SimulationInputConfig, SocketDecl};
pub use tree::NodeTree;
pub use value::{GeometrySet, SocketType, SocketValue};
