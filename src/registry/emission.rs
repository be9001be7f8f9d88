//! Per-record commit bundles and their results
//!
//! An emission is the set of node drafts and edges produced from one
//! evidence record. The registry validates and commits it: nodes always
//! commit (merging into existing ones), edges whose endpoints are missing
//! are rejected individually.

use crate::graph::{Edge, Node, NodeId};

/// Node drafts and edges produced from one record
#[derive(Debug, Clone, Default)]
pub struct Emission {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Emission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Why an individual item in an emission was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// Edge references a node that is neither in the registry nor the emission
    MissingEndpoint(NodeId),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEndpoint(id) => write!(f, "missing endpoint {}", id),
        }
    }
}

/// A single rejected item from an emission.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub description: String,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(description: impl Into<String>, reason: RejectionReason) -> Self {
        Self {
            description: description.into(),
            reason,
        }
    }
}

/// The result of committing an emission.
#[derive(Debug, Clone, Default)]
pub struct CommitResult {
    /// Nodes that did not exist before
    pub nodes_created: usize,
    /// Nodes merged into an existing entry
    pub nodes_merged: usize,
    /// Edges that were new
    pub edges_committed: usize,
    /// Edges that already existed
    pub edges_existing: usize,
    pub rejections: Vec<Rejection>,
}

impl CommitResult {
    /// True if no items were rejected
    pub fn is_fully_committed(&self) -> bool {
        self.rejections.is_empty()
    }

    /// True if the emission changed nothing and nothing was rejected
    pub fn is_noop(&self) -> bool {
        self.nodes_created == 0 && self.edges_committed == 0 && self.rejections.is_empty()
    }
}
