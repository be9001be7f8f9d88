//! EntityRegistry: the shared, concurrently mutable side of the graph
//!
//! Maps canonical keys to node ids and holds every node and edge produced
//! by ingestion. Each node lives in one `DashMap` entry; creation and merge
//! happen under that entry's shard lock, so two workers resolving the same
//! key converge on one node without surfacing a conflict.

mod emission;

pub use emission::{CommitResult, Emission, Rejection, RejectionReason};

use crate::canonical::{CanonicalKey, EntityKind};
use crate::graph::{Edge, KnowledgeGraph, Node, NodeId, NodeType};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Node id for a resolved entity: `<kind>:<canonical key>`.
pub fn entity_node_id(kind: EntityKind, key: &CanonicalKey) -> NodeId {
    NodeId::from_string(format!("{}:{}", kind.as_str(), key))
}

/// Node id for a mention that could not be resolved.
///
/// Scoped to the mention's reaction and role so that distinct unparsable
/// strings, or the same one in different records, never collapse.
pub fn unresolved_node_id(kind: EntityKind, scope: &str, raw: &str) -> NodeId {
    let name = format!("{}\u{1f}{}\u{1f}{}", kind.as_str(), scope, raw);
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
    NodeId::from_string(format!("{}:unknown:{}", kind.as_str(), uuid))
}

/// Shared registry of nodes and edges
#[derive(Debug, Default)]
pub struct EntityRegistry {
    nodes: DashMap<NodeId, Node>,
    edges: DashSet<Edge>,
    /// Condition node id → merged draft and the reactions that reported it
    condition_sightings: DashMap<NodeId, ConditionSighting>,
}

/// Every observation of one condition so far
#[derive(Debug, Clone)]
pub struct ConditionSighting {
    /// All drafts of the condition node, merged
    pub node: Node,
    pub reactions: BTreeSet<NodeId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an entity by kind and canonical key, recording `evidence`.
    ///
    /// The first call creates the node; later calls merge into it.
    pub fn resolve(&self, kind: EntityKind, key: &CanonicalKey, evidence: &str) -> NodeId {
        let node = Node::new(entity_node_id(kind, key), kind.node_type(), key.as_str())
            .with_evidence(evidence);
        self.resolve_node(node)
    }

    /// Insert a node draft or merge it into the existing node with its id.
    pub fn resolve_node(&self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.upsert(node);
        id
    }

    fn upsert(&self, node: Node) -> bool {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge(&node);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    /// Add an edge if both endpoints exist. Returns whether it was new.
    pub fn link(&self, edge: Edge) -> Result<bool, Rejection> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(Rejection::new(
                    edge.to_string(),
                    RejectionReason::MissingEndpoint(endpoint.clone()),
                ));
            }
        }
        Ok(self.edges.insert(edge))
    }

    /// Commit an emission: all nodes first, then edges.
    pub fn commit(&self, emission: Emission) -> CommitResult {
        let mut result = CommitResult::default();

        for node in emission.nodes {
            if self.upsert(node) {
                result.nodes_created += 1;
            } else {
                result.nodes_merged += 1;
            }
        }

        for edge in emission.edges {
            match self.link(edge) {
                Ok(true) => result.edges_committed += 1,
                Ok(false) => result.edges_existing += 1,
                Err(rejection) => result.rejections.push(rejection),
            }
        }

        result
    }

    /// Record that `reaction` reported the condition drafted as `node`.
    ///
    /// Returns the accumulated sighting: the merge of every draft seen so
    /// far and every reporting reaction, this one included.
    pub fn record_condition_sighting(&self, node: &Node, reaction: &NodeId) -> ConditionSighting {
        let mut entry = self
            .condition_sightings
            .entry(node.id.clone())
            .or_insert_with(|| ConditionSighting {
                node: node.clone(),
                reactions: BTreeSet::new(),
            });
        entry.node.merge(node);
        entry.reactions.insert(reaction.clone());
        entry.clone()
    }

    /// Merge an independently built graph into this registry.
    ///
    /// Returns edges dropped because an endpoint was missing.
    pub fn absorb(&self, graph: &KnowledgeGraph) -> Vec<Rejection> {
        for node in graph.nodes.values() {
            self.upsert(node.clone());
        }
        graph
            .edges
            .iter()
            .filter_map(|edge| self.link(edge.clone()).err())
            .collect()
    }

    /// Copy the current state into an ordered graph.
    pub fn snapshot(&self) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.metadata.created_at = Some(Utc::now());
        for entry in self.nodes.iter() {
            graph.nodes.insert(entry.key().clone(), entry.value().clone());
        }
        for edge in self.edges.iter() {
            graph.edges.insert(edge.key().clone());
        }
        graph
    }

    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).map(|n| n.clone())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn count_of_type(&self, node_type: NodeType) -> usize {
        self.nodes.iter().filter(|n| n.node_type == node_type).count()
    }
}
