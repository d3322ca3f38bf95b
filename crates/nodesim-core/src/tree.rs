//! NodeTree: the graph of nodes and socket links that gets evaluated.
//!
//! The tree is a petgraph `StableGraph` whose node weights are [`Node`]s and
//! whose edge weights are [`Link`]s. Nodes are addressed from the outside by
//! their stable [`NodeId`], never by graph index.
//!
//! # Node creation hooks
//!
//! Adding a node through [`NodeTree::add_node`] or [`NodeTree::insert_node`]
//! runs the kind's creation hook. For simulation inputs this is the pairing
//! step: the new input binds to the single simulation output that no other
//! input has claimed yet. Deserialized trees keep their stored bindings.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::link::Link;
use crate::node::{Node, NodeKind, SimulationInputConfig};

/// A tree of nodes connected by socket links.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeTree {
    graph: StableGraph<Node, Link, Directed, u32>,
    /// Next identifier handed out by `add_node`.
    next_id: u32,
}

impl NodeTree {
    pub fn new() -> Self {
        NodeTree {
            graph: StableGraph::new(),
            next_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Iterates nodes in graph order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterates `(from, to, link)` for every link.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, &Link)> + '_ {
        self.graph.edge_references().map(move |edge| {
            (
                self.graph[edge.source()].id,
                self.graph[edge.target()].id,
                edge.weight(),
            )
        })
    }

    /// Returns the upstream `(node, output socket)` feeding an input socket.
    pub fn input_link(&self, node: NodeId, socket: &str) -> Option<(NodeId, &str)> {
        let idx = self.index_of(node)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|edge| edge.weight().to_socket == socket)
            .map(|edge| {
                (
                    self.graph[edge.source()].id,
                    edge.weight().from_socket.as_str(),
                )
            })
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex<u32>> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].id == id)
    }

    fn require_index(&self, id: NodeId) -> Result<NodeIndex<u32>, CoreError> {
        self.index_of(id).ok_or(CoreError::NodeNotFound { id })
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Adds a node under a freshly allocated identifier.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.free_id();
        self.next_id = id.get().checked_add(1).unwrap_or(1);
        self.place(id, kind);
        id
    }

    /// First unused identifier at or after `next_id`, wrapping past `u32::MAX`.
    fn free_id(&self) -> NodeId {
        let mut candidate = NodeId::new(self.next_id).unwrap_or(NodeId::FIRST);
        while self.index_of(candidate).is_some() {
            candidate = candidate
                .get()
                .checked_add(1)
                .and_then(NodeId::new)
                .unwrap_or(NodeId::FIRST);
        }
        candidate
    }

    /// Adds a node under a caller-chosen identifier.
    pub fn insert_node(&mut self, id: u32, kind: NodeKind) -> Result<NodeId, CoreError> {
        let id = NodeId::new(id).ok_or(CoreError::ReservedNodeId)?;
        if self.index_of(id).is_some() {
            return Err(CoreError::DuplicateNodeId { id });
        }
        if id.get() >= self.next_id {
            self.next_id = id.get().checked_add(1).unwrap_or(1);
        }
        self.place(id, kind);
        Ok(id)
    }

    fn place(&mut self, id: NodeId, kind: NodeKind) {
        let idx = self.graph.add_node(Node::new(id, kind));
        if let NodeKind::SimulationInput(_) = self.graph[idx].kind {
            let output_node_id = self.find_unclaimed_simulation_output(id);
            self.graph[idx].kind =
                NodeKind::SimulationInput(SimulationInputConfig { output_node_id });
        }
    }

    /// Removes a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, CoreError> {
        let idx = self.require_index(id)?;
        self.graph
            .remove_node(idx)
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), CoreError> {
        let idx = self.require_index(id)?;
        self.graph[idx].name = name.into();
        Ok(())
    }

    /// Connects an output socket to an input socket.
    pub fn link(
        &mut self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> Result<(), CoreError> {
        if from == to {
            return Err(CoreError::SelfLink { node: from });
        }
        let from_idx = self.require_index(from)?;
        let to_idx = self.require_index(to)?;

        let output = self.graph[from_idx]
            .kind
            .output(from_socket)
            .ok_or_else(|| CoreError::SocketNotFound {
                node: from,
                socket: from_socket.to_string(),
                direction: "output",
            })?;
        let input = self.graph[to_idx]
            .kind
            .input(to_socket)
            .ok_or_else(|| CoreError::SocketNotFound {
                node: to,
                socket: to_socket.to_string(),
                direction: "input",
            })?;
        if output.socket_type != input.socket_type {
            return Err(CoreError::SocketTypeMismatch {
                from: output.socket_type,
                to: input.socket_type,
            });
        }
        if self.input_link(to, to_socket).is_some() {
            return Err(CoreError::InputAlreadyLinked {
                node: to,
                socket: to_socket.to_string(),
            });
        }

        self.graph
            .add_edge(from_idx, to_idx, Link::new(from_socket, to_socket));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Simulation pairing
    // -----------------------------------------------------------------------

    /// Finds the simulation output a new input `node` should pair with.
    ///
    /// Candidates are simulation outputs not already named by some other
    /// simulation input. Exactly one candidate binds; zero or several leave
    /// the input unbound.
    pub fn find_unclaimed_simulation_output(&self, node: NodeId) -> Option<NodeId> {
        let claimed: HashSet<NodeId> = self
            .nodes()
            .filter(|other| other.id != node)
            .filter_map(|other| other.simulation_config())
            .filter_map(|config| config.output_node_id)
            .collect();

        let mut candidates = self
            .nodes()
            .filter(|other| other.is_simulation_output() && !claimed.contains(&other.id))
            .map(|other| other.id);

        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Recomputes the pairing of a simulation input after a structural edit.
    pub fn rebind_simulation_input(&mut self, node: NodeId) -> Result<Option<NodeId>, CoreError> {
        let idx = self.require_index(node)?;
        if !matches!(self.graph[idx].kind, NodeKind::SimulationInput(_)) {
            return Err(CoreError::WrongNodeKind {
                id: node,
                expected: "Simulation Input",
            });
        }
        let output_node_id = self.find_unclaimed_simulation_output(node);
        self.graph[idx].kind = NodeKind::SimulationInput(SimulationInputConfig { output_node_id });
        Ok(output_node_id)
    }

    /// Pairs a simulation input with an explicit output, or unpairs it.
    pub fn set_simulation_binding(
        &mut self,
        node: NodeId,
        output: Option<NodeId>,
    ) -> Result<(), CoreError> {
        let idx = self.require_index(node)?;
        if let Some(output) = output {
            let target = self.require_index(output)?;
            if !self.graph[target].is_simulation_output() {
                return Err(CoreError::WrongNodeKind {
                    id: output,
                    expected: "Simulation Output",
                });
            }
        }
        match &mut self.graph[idx].kind {
            NodeKind::SimulationInput(config) => {
                config.output_node_id = output;
                Ok(())
            }
            _ => Err(CoreError::WrongNodeKind {
                id: node,
                expected: "Simulation Input",
            }),
        }
    }

    /// Lists `(input, bound output)` for every simulation input.
    pub fn simulation_bindings(&self) -> Vec<(NodeId, Option<NodeId>)> {
        self.nodes()
            .filter_map(|node| {
                node.simulation_config()
                    .map(|config| (node.id, config.output_node_id))
            })
            .collect()
    }
}
