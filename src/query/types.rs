//! Query result structures

use crate::graph::Node;

/// Result of a find query
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Nodes matching the query, in id order
    pub nodes: Vec<Node>,
    /// Total count (may differ from nodes.len() if limit applied)
    pub total_count: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            total_count: 0,
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let total_count = nodes.len();
        Self { nodes, total_count }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Canonical keys of the matched nodes
    pub fn keys(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.canonical_key.as_str()).collect()
    }
}
