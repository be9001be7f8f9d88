//! Node-link JSON
//!
//! `{"directed": true, "graph": {...}, "nodes": [...], "links": [...]}`,
//! the layout graph libraries commonly read.

use super::ExportError;
use crate::graph::{Edge, GraphMetadata, KnowledgeGraph, Node, NodeId, NodeType, Properties, Relationship};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub graph: GraphMetadata,
    pub nodes: Vec<NodeLinkNode>,
    pub links: Vec<NodeLinkEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub canonical_key: String,
    pub role_labels: Vec<String>,
    pub evidence: Vec<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkEdge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub relationship: Relationship,
}

impl From<&KnowledgeGraph> for NodeLinkGraph {
    fn from(graph: &KnowledgeGraph) -> Self {
        Self {
            directed: true,
            graph: graph.metadata.clone(),
            nodes: graph
                .nodes
                .values()
                .map(|n| NodeLinkNode {
                    id: n.id.clone(),
                    node_type: n.node_type,
                    canonical_key: n.canonical_key.clone(),
                    role_labels: n.role_labels.clone(),
                    evidence: n.evidence.iter().cloned().collect(),
                    properties: n.properties.clone(),
                })
                .collect(),
            links: graph
                .edges
                .iter()
                .map(|e| NodeLinkEdge {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    relationship: e.relationship,
                })
                .collect(),
        }
    }
}

impl NodeLinkGraph {
    pub fn into_graph(self) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.metadata = self.graph;
        for n in self.nodes {
            let mut node = Node::new(n.id, n.node_type, n.canonical_key).with_role_labels(n.role_labels);
            node.evidence = n.evidence.into_iter().collect();
            node.properties = n.properties;
            graph.add_node(node);
        }
        for link in self.links {
            graph.add_edge(Edge::new(link.source, link.target, link.relationship));
        }
        graph
    }
}

pub fn to_string(graph: &KnowledgeGraph) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&NodeLinkGraph::from(graph))?)
}

pub fn from_str(text: &str) -> Result<KnowledgeGraph, ExportError> {
    let parsed: NodeLinkGraph = serde_json::from_str(text)?;
    Ok(parsed.into_graph())
}

pub fn save(graph: &KnowledgeGraph, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &NodeLinkGraph::from(graph))?;
    writer.flush().map_err(|e| ExportError::io(path, e))
}

pub fn load(path: &Path) -> Result<KnowledgeGraph, ExportError> {
    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    let parsed: NodeLinkGraph = serde_json::from_reader(BufReader::new(file))?;
    Ok(parsed.into_graph())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_type_fields() {
        let mut graph = KnowledgeGraph::new();
        let paper = Node::new(NodeId::from("paper:d"), NodeType::Paper, "d");
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        graph.add_edge(Edge::new(paper.id.clone(), reaction.id.clone(), Relationship::Contains));
        graph.add_node(paper);
        graph.add_node(reaction);

        let value: serde_json::Value = serde_json::from_str(&to_string(&graph).unwrap()).unwrap();
        assert_eq!(value["directed"], true);
        assert_eq!(value["nodes"][0]["type"], "Paper");
        assert_eq!(value["links"][0]["type"], "contains");
        assert_eq!(from_str(&to_string(&graph).unwrap()).unwrap().edges, graph.edges);
    }
}
