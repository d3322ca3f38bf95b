//! Stable ID newtypes for node tree entities.
//!
//! [`NodeId`] is the persistent identifier of a node within its tree. It is
//! independent of the petgraph index the node happens to occupy, so it
//! survives removals and serialization. Identifier `0` is reserved to mean
//! "no node" in persisted configuration and is never handed out.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// The lowest identifier a tree hands out.
    pub const FIRST: NodeId = NodeId(NonZeroU32::MIN);

    /// Creates a node identifier, returning `None` for the reserved value `0`.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(NodeId)
    }

    /// Returns the raw identifier value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
