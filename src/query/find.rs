//! Find queries for locating nodes

use super::types::QueryResult;
use crate::graph::{KnowledgeGraph, Node, NodeId, NodeType, PropertyValue, Relationship};

/// Query for finding nodes by various criteria
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    /// Filter by node type
    pub node_type: Option<NodeType>,
    /// Filter by role label (any position in the label list)
    pub role_label: Option<String>,
    /// Filter by exact canonical key
    pub canonical_key: Option<String>,
    /// Filter by property key existence
    pub has_property: Option<String>,
    /// Filter by property key-value match
    pub property_equals: Option<(String, PropertyValue)>,
    /// Keep nodes linked from this node by this relationship
    pub linked_from: Option<(NodeId, Relationship)>,
    /// Keep nodes linking to this node by this relationship
    pub linked_to: Option<(NodeId, Relationship)>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Number of results to skip
    pub offset: Option<usize>,
}

impl FindQuery {
    /// Create a new empty query (matches all nodes)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Filter by role label, e.g. `"Alpha-Diazo-Ester"`
    pub fn with_role_label(mut self, label: impl Into<String>) -> Self {
        self.role_label = Some(label.into());
        self
    }

    pub fn with_canonical_key(mut self, key: impl Into<String>) -> Self {
        self.canonical_key = Some(key.into());
        self
    }

    /// Filter by property existence
    pub fn with_property(mut self, key: impl Into<String>) -> Self {
        self.has_property = Some(key.into());
        self
    }

    /// Filter by property value
    pub fn with_property_value(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.property_equals = Some((key.into(), value));
        self
    }

    /// Targets of `source --relationship-->`
    pub fn linked_from(mut self, source: NodeId, relationship: Relationship) -> Self {
        self.linked_from = Some((source, relationship));
        self
    }

    /// Sources of `--relationship--> target`
    pub fn linked_to(mut self, target: NodeId, relationship: Relationship) -> Self {
        self.linked_to = Some((target, relationship));
        self
    }

    /// Limit results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip results (for pagination)
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Execute the query against a graph snapshot
    pub fn execute(&self, graph: &KnowledgeGraph) -> QueryResult {
        let matched: Vec<&Node> = graph
            .nodes
            .values()
            .filter(|node| self.matches(graph, node))
            .collect();
        let total_count = matched.len();

        let nodes = matched
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        QueryResult { nodes, total_count }
    }

    /// Check if a node matches all query criteria
    fn matches(&self, graph: &KnowledgeGraph, node: &Node) -> bool {
        if self.node_type.is_some_and(|t| t != node.node_type) {
            return false;
        }

        if let Some(ref label) = self.role_label {
            if !node.has_role_label(label) {
                return false;
            }
        }

        if let Some(ref key) = self.canonical_key {
            if &node.canonical_key != key {
                return false;
            }
        }

        if let Some(ref key) = self.has_property {
            if !node.properties.contains_key(key) {
                return false;
            }
        }

        if let Some((ref key, ref expected_value)) = self.property_equals {
            match node.properties.get(key) {
                Some(value) if value == expected_value => {}
                _ => return false,
            }
        }

        if let Some((ref source, relationship)) = self.linked_from {
            if !graph
                .edges
                .iter()
                .any(|e| &e.source == source && e.target == node.id && e.relationship == relationship)
            {
                return false;
            }
        }

        if let Some((ref target, relationship)) = self.linked_to {
            if !graph
                .outgoing(&node.id)
                .any(|e| &e.target == target && e.relationship == relationship)
            {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn create_test_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();

        let reaction = Node::new(NodeId::from("reaction:r1"), NodeType::Reaction, "r1")
            .with_property("paper", "paper-1.pdf");
        let styrene = Node::new(NodeId::from("structure:C=Cc1ccccc1"), NodeType::Molecule, "C=Cc1ccccc1")
            .with_role_labels(vec!["Styrene-Like".into(), "Isolated-Alkene".into()]);
        let hexene = Node::new(NodeId::from("structure:C=CCCCC"), NodeType::Molecule, "C=CCCCC")
            .with_role_labels(vec!["Isolated-Alkene".into()]);
        let peptide = Node::new(NodeId::from("peptide:HLVFFAE"), NodeType::Peptide, "HLVFFAE")
            .with_role_labels(vec!["Amyloid-Core-Motif".into()]);

        graph.add_edge(Edge::new(reaction.id.clone(), styrene.id.clone(), Relationship::HasSubstrate));
        graph.add_edge(Edge::new(reaction.id.clone(), peptide.id.clone(), Relationship::CatalyzedBy));
        graph.add_node(reaction);
        graph.add_node(styrene);
        graph.add_node(hexene);
        graph.add_node(peptide);
        graph
    }

    #[test]
    fn test_find_all() {
        let graph = create_test_graph();
        let result = FindQuery::new().execute(&graph);
        assert_eq!(result.nodes.len(), 4);
        assert_eq!(result.total_count, 4);
    }

    #[test]
    fn test_find_by_role_label() {
        let graph = create_test_graph();
        let result = FindQuery::new()
            .with_node_type(NodeType::Molecule)
            .with_role_label("Isolated-Alkene")
            .execute(&graph);
        assert_eq!(result.keys(), vec!["C=CCCCC", "C=Cc1ccccc1"]);

        let primary = FindQuery::new().with_role_label("Styrene-Like").execute(&graph);
        assert_eq!(primary.nodes.len(), 1);
    }

    #[test]
    fn test_find_by_property_value() {
        let graph = create_test_graph();
        let result = FindQuery::new()
            .with_property_value("paper", PropertyValue::String("paper-1.pdf".into()))
            .execute(&graph);
        assert_eq!(result.nodes[0].node_type, NodeType::Reaction);
    }

    #[test]
    fn test_find_by_link() {
        let graph = create_test_graph();
        let catalysts = FindQuery::new()
            .linked_from(NodeId::from("reaction:r1"), Relationship::CatalyzedBy)
            .execute(&graph);
        assert_eq!(catalysts.keys(), vec!["HLVFFAE"]);

        let users = FindQuery::new()
            .linked_to(NodeId::from("structure:C=Cc1ccccc1"), Relationship::HasSubstrate)
            .execute(&graph);
        assert_eq!(users.keys(), vec!["r1"]);
    }

    #[test]
    fn test_pagination() {
        let graph = create_test_graph();
        let result = FindQuery::new().offset(1).limit(2).execute(&graph);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.total_count, 4);

        let past_end = FindQuery::new().offset(10).execute(&graph);
        assert!(past_end.is_empty());
    }
}
