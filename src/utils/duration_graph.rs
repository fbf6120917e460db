use crate::models::{LocationId, Time, USER_NODE_ID};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Sparse directed graph of travel durations between candidate locations
/// and the user.
///
/// Nodes are keyed by location id, the user being [`USER_NODE_ID`]. A
/// missing edge means no known route. Durations are asymmetric.
#[derive(Debug, Clone)]
pub struct DurationGraph {
    graph: DiGraph<LocationId, Time>,
    nodes: HashMap<LocationId, NodeIndex>,
    user: NodeIndex,
}

impl DurationGraph {
    /// Create a graph holding only the user node
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let user = graph.add_node(USER_NODE_ID.to_string());
        let mut nodes = HashMap::new();
        nodes.insert(USER_NODE_ID.to_string(), user);

        DurationGraph { graph, nodes, user }
    }

    /// Node of the user's position
    pub fn user(&self) -> NodeIndex {
        self.user
    }

    /// Returns the node for `id`, adding it when absent
    pub fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.to_string());
        self.nodes.insert(id.to_string(), node);
        node
    }

    /// Record the duration from `from` to `to`, replacing any earlier value.
    /// Self-loops carry no information and are ignored.
    pub fn insert(&mut self, from: &str, to: &str, duration: Time) {
        if from == to {
            return;
        }
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        self.graph.update_edge(a, b, duration);
    }

    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    /// Location id of a node
    pub fn id(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    pub fn duration(&self, from: NodeIndex, to: NodeIndex) -> Option<Time> {
        self.graph
            .find_edge(from, to)
            .and_then(|edge| self.graph.edge_weight(edge))
            .copied()
    }

    pub fn duration_between(&self, from: &str, to: &str) -> Option<Time> {
        self.duration(self.node(from)?, self.node(to)?)
    }

    /// Outgoing edges of `node` as (target, duration)
    pub fn outgoing(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Time)> + '_ {
        self.graph
            .edges(node)
            .map(|edge| (edge.target(), *edge.weight()))
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DurationGraph {
    fn default() -> Self {
        Self::new()
    }
}
