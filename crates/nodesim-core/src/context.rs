//! Compute contexts: where in the call tree a node is being evaluated.
//!
//! A [`ComputeContext`] is an immutable link in a chain that starts at a
//! root (one evaluation target, e.g. one object's modifier) and grows by one
//! link every time evaluation descends into a nested scope: a group, one
//! iteration of a repeat, or a simulation pairing. Contexts are created on
//! the evaluator's stack and borrow their parent, so they never outlive the
//! evaluation frame that made them.
//!
//! # Hashing
//!
//! Every context carries a [`ContextHash`] computed once at construction
//! with blake3 over the parent's hash and a tagged encoding of the local
//! link. Two contexts built independently along the same path always hash
//! equal; any difference in the path (including order and repeat iteration)
//! yields a different hash. The encoding is prefix-free:
//!
//! - root: `0x00`, tag, label length (u64 LE), label bytes
//! - child: `0x01`, parent hash (32 bytes), tag, fields (LE)

use std::fmt;

use crate::id::NodeId;

/// Deterministic 256-bit key identifying a compute context.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextHash([u8; 32]);

impl ContextHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl From<blake3::Hash> for ContextHash {
    fn from(hash: blake3::Hash) -> Self {
        ContextHash(*hash.as_bytes())
    }
}

impl fmt::Display for ContextHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContextHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextHash({})", &self.to_hex()[..12])
    }
}

/// The local part of one link in a context chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    /// Start of a chain, named by the evaluation target.
    Root(String),
    /// Inside the nested tree of a group node.
    Group(NodeId),
    /// Inside one iteration of a repeat node.
    RepeatIteration { node: NodeId, iteration: u32 },
    /// The cache bucket of a simulation pairing, named by its output node.
    Simulation(NodeId),
}

impl ContextKind {
    fn tag(&self) -> u8 {
        match self {
            ContextKind::Root(_) => 0,
            ContextKind::Group(_) => 1,
            ContextKind::RepeatIteration { .. } => 2,
            ContextKind::Simulation(_) => 3,
        }
    }

    fn write_to(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&[self.tag()]);
        match self {
            ContextKind::Root(label) => {
                hasher.update(&(label.len() as u64).to_le_bytes());
                hasher.update(label.as_bytes());
            }
            ContextKind::Group(node) | ContextKind::Simulation(node) => {
                hasher.update(&node.get().to_le_bytes());
            }
            ContextKind::RepeatIteration { node, iteration } => {
                hasher.update(&node.get().to_le_bytes());
                hasher.update(&iteration.to_le_bytes());
            }
        }
    }
}

/// One link of a call path, borrowing its parent.
#[derive(Debug, Clone)]
pub struct ComputeContext<'a> {
    parent: Option<&'a ComputeContext<'a>>,
    kind: ContextKind,
    hash: ContextHash,
}

impl ComputeContext<'static> {
    /// Starts a new chain.
    pub fn root(label: impl Into<String>) -> Self {
        let kind = ContextKind::Root(label.into());
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[0]);
        kind.write_to(&mut hasher);
        ComputeContext {
            parent: None,
            kind,
            hash: hasher.finalize().into(),
        }
    }
}

impl<'a> ComputeContext<'a> {
    /// Extends this chain by one link.
    pub fn child(&'a self, kind: ContextKind) -> ComputeContext<'a> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[1]);
        hasher.update(self.hash.as_bytes());
        kind.write_to(&mut hasher);
        ComputeContext {
            parent: Some(self),
            kind,
            hash: hasher.finalize().into(),
        }
    }

    pub fn group(&'a self, node: NodeId) -> ComputeContext<'a> {
        self.child(ContextKind::Group(node))
    }

    pub fn repeat_iteration(&'a self, node: NodeId, iteration: u32) -> ComputeContext<'a> {
        self.child(ContextKind::RepeatIteration { node, iteration })
    }

    pub fn simulation(&'a self, output_node: NodeId) -> ComputeContext<'a> {
        self.child(ContextKind::Simulation(output_node))
    }

    pub fn hash(&self) -> ContextHash {
        self.hash
    }

    pub fn parent(&self) -> Option<&'a ComputeContext<'a>> {
        self.parent
    }

    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    /// Number of links above the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent;
        while let Some(ctx) = current {
            depth += 1;
            current = ctx.parent;
        }
        depth
    }

    /// The chain from root to this context.
    pub fn path(&self) -> Vec<&ContextKind> {
        let mut path = vec![&self.kind];
        let mut current = self.parent;
        while let Some(ctx) = current {
            path.push(&ctx.kind);
            current = ctx.parent;
        }
        path.reverse();
        path
    }
}
