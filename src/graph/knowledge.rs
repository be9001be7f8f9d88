//! KnowledgeGraph: an ordered, owned snapshot of the merged graph

use super::edge::{Edge, Relationship};
use super::node::{Node, NodeId, NodeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Metadata about a graph snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// When the snapshot was taken
    pub created_at: Option<DateTime<Utc>>,
    /// Human-readable name
    pub name: Option<String>,
}

/// The merged reaction graph
///
/// Nodes are keyed by id and edges kept as a set, both ordered, so that two
/// graphs built from the same evidence compare and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: BTreeSet<Edge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    /// Add a node, merging into any existing node with the same id
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        match self.nodes.get_mut(&id) {
            Some(existing) => existing.merge(&node),
            None => {
                self.nodes.insert(id.clone(), node);
            }
        }
        id
    }

    /// Add an edge. Returns false for an exact duplicate.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes of one type in id order
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.node_type == node_type)
    }

    /// Edges leaving `id`
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == id)
    }

    /// Targets of edges leaving `id` with the given relationship
    pub fn targets<'a>(
        &'a self,
        id: &'a NodeId,
        relationship: Relationship,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.outgoing(id)
            .filter(move |e| e.relationship == relationship)
            .filter_map(|e| self.nodes.get(&e.target))
    }

    /// Merge another graph into this one using node merge semantics.
    ///
    /// Edges whose endpoints are missing after the merge are dropped and
    /// returned.
    pub fn absorb(&mut self, other: &KnowledgeGraph) -> Vec<Edge> {
        for node in other.nodes.values() {
            self.add_node(node.clone());
        }
        let mut dangling = Vec::new();
        for edge in &other.edges {
            if self.contains_node(&edge.source) && self.contains_node(&edge.target) {
                self.edges.insert(edge.clone());
            } else {
                dangling.push(edge.clone());
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(id: &str) -> Node {
        Node::new(NodeId::from(id), NodeType::Reaction, id)
    }

    fn molecule(key: &str, raw: &str) -> Node {
        Node::new(NodeId::from_string(format!("structure:{}", key)), NodeType::Molecule, key)
            .with_evidence(raw)
    }

    #[test]
    fn add_node_merges_same_id() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(molecule("CCO", "OCC"));
        graph.add_node(molecule("CCO", "CCO"));

        assert_eq!(graph.node_count(), 1);
        let node = graph.get_node(&NodeId::from("structure:CCO")).unwrap();
        assert_eq!(node.evidence.len(), 2);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(reaction("reaction:a"));
        graph.add_node(molecule("CCO", "CCO"));
        let edge = Edge::new("reaction:a".into(), "structure:CCO".into(), Relationship::HasSubstrate);

        assert!(graph.add_edge(edge.clone()));
        assert!(!graph.add_edge(edge));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn targets_filters_by_relationship() {
        let mut graph = KnowledgeGraph::new();
        let r = graph.add_node(reaction("reaction:a"));
        graph.add_node(molecule("CCO", "CCO"));
        graph.add_node(molecule("O", "O"));
        graph.add_edge(Edge::new(r.clone(), "structure:CCO".into(), Relationship::HasSubstrate));
        graph.add_edge(Edge::new(r.clone(), "structure:O".into(), Relationship::HasProduct));

        let substrates: Vec<_> = graph.targets(&r, Relationship::HasSubstrate).collect();
        assert_eq!(substrates.len(), 1);
        assert_eq!(substrates[0].canonical_key, "CCO");
    }

    #[test]
    fn absorb_is_order_independent() {
        let mut left = KnowledgeGraph::new();
        left.add_node(molecule("CCO", "OCC"));
        let mut right = KnowledgeGraph::new();
        right.add_node(molecule("CCO", "CCO"));
        right.add_node(reaction("reaction:a"));
        right.add_edge(Edge::new("reaction:a".into(), "structure:CCO".into(), Relationship::HasSubstrate));

        let mut lr = left.clone();
        lr.absorb(&right);
        let mut rl = right.clone();
        rl.absorb(&left);

        assert_eq!(lr.nodes, rl.nodes);
        assert_eq!(lr.edges, rl.edges);
    }

    #[test]
    fn absorb_reports_dangling_edges() {
        let mut graph = KnowledgeGraph::new();
        let mut other = KnowledgeGraph::new();
        other.edges.insert(Edge::new("reaction:x".into(), "structure:C".into(), Relationship::HasProduct));

        let dangling = graph.absorb(&other);
        assert_eq!(dangling.len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
