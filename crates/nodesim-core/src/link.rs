//! Links between node sockets.
//!
//! A [`Link`] is the edge weight of the tree's graph: the edge endpoints
//! identify the nodes, the link names the sockets on each side. Links always
//! run from an output socket to an input socket, and an input accepts at
//! most one link.

use serde::{Deserialize, Serialize};

/// Socket pair carried by a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Output socket on the source node.
    pub from_socket: String,
    /// Input socket on the target node.
    pub to_socket: String,
}

impl Link {
    pub fn new(from_socket: impl Into<String>, to_socket: impl Into<String>) -> Self {
        Link {
            from_socket: from_socket.into(),
            to_socket: to_socket.into(),
        }
    }
}
