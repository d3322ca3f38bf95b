//! Node definitions and their socket declarations.
//!
//! Every [`NodeKind`] declares a fixed list of input and output sockets.
//! Sockets are addressed by name, matching how node bodies request inputs
//! and publish outputs during lazy evaluation.

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::id::NodeId;
use crate::tree::NodeTree;
use crate::value::SocketType;

/// Socket names shared by node declarations and node bodies.
pub mod socket {
    pub const GEOMETRY: &str = "Geometry";
    pub const DELTA_TIME: &str = "Delta Time";
    pub const ELAPSED_TIME: &str = "Elapsed Time";
    pub const VALUE: &str = "Value";
    pub const OFFSET: &str = "Offset";
    pub const ITERATION: &str = "Iteration";
}

/// A declared socket on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketDecl {
    pub name: &'static str,
    pub socket_type: SocketType,
}

impl SocketDecl {
    const fn new(name: &'static str, socket_type: SocketType) -> Self {
        SocketDecl { name, socket_type }
    }
}

/// Socket list; no node declares more than three sockets per side.
pub type SocketDecls = SmallVec<[SocketDecl; 3]>;

const GEOMETRY: SocketDecl = SocketDecl::new(socket::GEOMETRY, SocketType::Geometry);

/// Persistent configuration of a simulation input node.
///
/// `output_node_id` names the paired simulation output node. It is filled
/// in when the node is added to a tree and only recomputed on explicit
/// rebinds. Unbound is persisted as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInputConfig {
    #[serde(with = "unbound_as_zero")]
    pub output_node_id: Option<NodeId>,
}

impl SimulationInputConfig {
    pub fn bound_to(output: NodeId) -> Self {
        SimulationInputConfig {
            output_node_id: Some(output),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.output_node_id.is_some()
    }
}

mod unbound_as_zero {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::id::NodeId;

    pub fn serialize<S: Serializer>(id: &Option<NodeId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(id.map_or(0, NodeId::get))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NodeId>, D::Error> {
        Ok(NodeId::new(u32::deserialize(d)?))
    }
}

/// What a node does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// Exposes the enclosing group's Geometry input inside a nested tree.
    GroupInput,
    /// Collects the nested tree's Geometry result.
    GroupOutput,
    /// Constant point geometry.
    Points { points: Vec<[f32; 3]> },
    /// Constant float.
    Float { value: f32 },
    /// Moves geometry by `direction * Offset`.
    Translate { direction: [f32; 3] },
    SimulationInput(SimulationInputConfig),
    SimulationOutput,
    /// Evaluates a nested tree once.
    Group { tree: Box<NodeTree> },
    /// Evaluates a nested tree `iterations` times, feeding Geometry through.
    Repeat { iterations: u32, tree: Box<NodeTree> },
}

impl NodeKind {
    /// An unbound simulation input; binding happens when it is added to a tree.
    pub fn simulation_input() -> Self {
        NodeKind::SimulationInput(SimulationInputConfig::default())
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::GroupInput => "Group Input",
            NodeKind::GroupOutput => "Group Output",
            NodeKind::Points { .. } => "Points",
            NodeKind::Float { .. } => "Float",
            NodeKind::Translate { .. } => "Translate",
            NodeKind::SimulationInput(_) => "Simulation Input",
            NodeKind::SimulationOutput => "Simulation Output",
            NodeKind::Group { .. } => "Group",
            NodeKind::Repeat { .. } => "Repeat",
        }
    }

    pub fn inputs(&self) -> SocketDecls {
        match self {
            NodeKind::GroupInput | NodeKind::Points { .. } | NodeKind::Float { .. } => {
                SmallVec::new()
            }
            NodeKind::Translate { .. } => smallvec![
                GEOMETRY,
                SocketDecl::new(socket::OFFSET, SocketType::Float),
            ],
            NodeKind::GroupOutput
            | NodeKind::SimulationInput(_)
            | NodeKind::SimulationOutput
            | NodeKind::Group { .. }
            | NodeKind::Repeat { .. } => smallvec![GEOMETRY],
        }
    }

    pub fn outputs(&self) -> SocketDecls {
        match self {
            NodeKind::GroupOutput => SmallVec::new(),
            NodeKind::Float { .. } => {
                smallvec![SocketDecl::new(socket::VALUE, SocketType::Float)]
            }
            NodeKind::SimulationInput(_) => smallvec![
                SocketDecl::new(socket::DELTA_TIME, SocketType::Float),
                SocketDecl::new(socket::ELAPSED_TIME, SocketType::Float),
                GEOMETRY,
            ],
            NodeKind::GroupInput => smallvec![
                GEOMETRY,
                SocketDecl::new(socket::ITERATION, SocketType::Float),
            ],
            NodeKind::Points { .. }
            | NodeKind::Translate { .. }
            | NodeKind::SimulationOutput
            | NodeKind::Group { .. }
            | NodeKind::Repeat { .. } => smallvec![GEOMETRY],
        }
    }

    pub fn input(&self, name: &str) -> Option<SocketDecl> {
        self.inputs().into_iter().find(|s| s.name == name)
    }

    pub fn output(&self, name: &str) -> Option<SocketDecl> {
        self.outputs().into_iter().find(|s| s.name == name)
    }
}

/// A node in a [`NodeTree`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Node {
            id,
            name: kind.label().to_string(),
            kind,
        }
    }

    pub fn simulation_config(&self) -> Option<&SimulationInputConfig> {
        match &self.kind {
            NodeKind::SimulationInput(config) => Some(config),
            _ => None,
        }
    }

    pub fn is_simulation_output(&self) -> bool {
        matches!(self.kind, NodeKind::SimulationOutput)
    }
}
