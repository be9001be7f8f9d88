//! Quality Evaluator: Reaction Context and Chemical Resolution scores
//!
//! RCS measures, per Reaction, the fraction of required context fields the
//! evidence supplied. CRS measures, per Molecule or Peptide, whether the
//! entity was both resolved and classified. Corpus scores are plain means
//! with the numerator and denominator kept alongside.

mod report;

pub use report::{EntityScore, GraphCounts, QualityReport, Ratio, ReactionScore};

use crate::classify::is_classified;
use crate::graph::{KnowledgeGraph, Node, NodeType, PropertyValue, Relationship};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A context field a Reaction may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    Catalyst,
    Condition,
    Substrate,
    Product,
}

impl ContextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalyst => "catalyst",
            Self::Condition => "condition",
            Self::Substrate => "substrate",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub required_context: Vec<ContextField>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            required_context: vec![ContextField::Catalyst, ContextField::Condition, ContextField::Substrate],
        }
    }
}

/// Scores graph snapshots. Never mutates the graph.
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator {
    config: QualityConfig,
}

impl QualityEvaluator {
    pub fn new(config: QualityConfig) -> Self {
        let mut config = config;
        config.required_context.sort();
        config.required_context.dedup();
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn score(&self, graph: &KnowledgeGraph) -> QualityReport {
        let reactions: Vec<ReactionScore> = graph
            .nodes_of_type(NodeType::Reaction)
            .map(|reaction| self.score_reaction(graph, reaction))
            .collect();
        let entities: Vec<EntityScore> = graph
            .nodes
            .values()
            .filter(|n| n.node_type.is_chemical_entity())
            .map(score_entity)
            .collect();

        let rcs = Ratio::new(reactions.iter().map(|r| r.rcs).sum(), reactions.len());
        let crs = Ratio::new(entities.iter().map(|e| e.crs).sum(), entities.len());
        let counts = GraphCounts {
            papers: graph.nodes_of_type(NodeType::Paper).count(),
            reactions: reactions.len(),
            molecules: graph.nodes_of_type(NodeType::Molecule).count(),
            peptides: graph.nodes_of_type(NodeType::Peptide).count(),
            conditions: graph.nodes_of_type(NodeType::Condition).count(),
            edges: graph.edge_count(),
        };
        let knowledge_density = if counts.papers == 0 {
            0.0
        } else {
            (counts.nodes() - counts.papers) as f64 / counts.papers as f64
        };

        QualityReport {
            generated_at: Utc::now(),
            counts,
            corpus_rcs: rcs.value(),
            corpus_crs: crs.value(),
            rcs,
            crs,
            knowledge_density,
            overall: 0.5 * rcs.value() + 0.5 * crs.value(),
            reactions,
            entities,
        }
    }

    fn score_reaction(&self, graph: &KnowledgeGraph, reaction: &Node) -> ReactionScore {
        let (present, missing): (Vec<ContextField>, Vec<ContextField>) = self
            .config
            .required_context
            .iter()
            .partition(|field| has_context(graph, reaction, **field));
        let required = self.config.required_context.len();
        let rcs = if required == 0 {
            0.0
        } else {
            present.len() as f64 / required as f64
        };
        ReactionScore {
            reaction: reaction.id.clone(),
            label: reaction
                .property("label")
                .and_then(PropertyValue::as_str)
                .unwrap_or_default()
                .to_string(),
            paper: reaction.property("paper").and_then(PropertyValue::as_str).map(str::to_string),
            present: present.iter().map(|f| f.to_string()).collect(),
            missing: missing.iter().map(|f| f.to_string()).collect(),
            rcs,
        }
    }
}

/// Score with the default required context
pub fn score(graph: &KnowledgeGraph) -> QualityReport {
    QualityEvaluator::default().score(graph)
}

fn has_context(graph: &KnowledgeGraph, reaction: &Node, field: ContextField) -> bool {
    let linked = |relationship| graph.targets(&reaction.id, relationship).next().is_some();
    match field {
        ContextField::Catalyst => linked(Relationship::CatalyzedBy),
        ContextField::Substrate => linked(Relationship::HasSubstrate),
        ContextField::Product => linked(Relationship::HasProduct),
        ContextField::Condition => {
            let inline = matches!(reaction.property("conditions"), Some(PropertyValue::Object(map)) if !map.is_empty());
            inline || linked(Relationship::UsesCondition)
        }
    }
}

fn score_entity(node: &Node) -> EntityScore {
    let resolved = !node.is_unknown() && is_classified(&node.role_labels);
    EntityScore {
        entity: node.id.clone(),
        node_type: node.node_type.to_string(),
        canonical_key: node.canonical_key.clone(),
        role_labels: node.role_labels.clone(),
        crs: if resolved { 1.0 } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeId};

    fn graph_with(reaction: Node, linked: Vec<(Node, Relationship)>) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        let paper = Node::new(NodeId::from("paper:d"), NodeType::Paper, "d");
        graph.add_edge(Edge::new(paper.id.clone(), reaction.id.clone(), Relationship::Contains));
        graph.add_node(paper);
        for (node, relationship) in linked {
            graph.add_edge(Edge::new(reaction.id.clone(), node.id.clone(), relationship));
            graph.add_node(node);
        }
        graph.add_node(reaction);
        graph
    }

    fn molecule(key: &str, labels: &[&str]) -> Node {
        Node::new(NodeId::from_string(format!("structure:{}", key)), NodeType::Molecule, key)
            .with_role_labels(labels.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn empty_graph_scores_zero() {
        let report = score(&KnowledgeGraph::new());
        assert_eq!(report.corpus_rcs, 0.0);
        assert_eq!(report.corpus_crs, 0.0);
        assert_eq!(report.rcs.denominator, 0);
        assert_eq!(report.crs.denominator, 0);
        assert_eq!(report.knowledge_density, 0.0);
    }

    #[test]
    fn rcs_counts_required_fields() {
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        let graph = graph_with(
            reaction,
            vec![(molecule("CCO", &["Alkyl-Amine"]), Relationship::HasSubstrate)],
        );
        let report = score(&graph);
        assert!((report.corpus_rcs - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.reactions[0].missing, vec!["catalyst".to_string(), "condition".to_string()]);
    }

    #[test]
    fn inline_conditions_count_as_present() {
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r").with_property(
            "conditions",
            PropertyValue::Object([("solvent".to_string(), PropertyValue::from("water"))].into()),
        );
        let graph = graph_with(reaction, vec![]);
        assert_eq!(score(&graph).reactions[0].present, vec!["condition".to_string()]);
    }

    #[test]
    fn crs_requires_key_and_label() {
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        let unknown = Node::new(NodeId::from("structure:unknown:x"), NodeType::Molecule, "Unknown")
            .with_role_labels(vec!["Unclassified".into()]);
        let graph = graph_with(
            reaction,
            vec![
                (molecule("C=Cc1ccccc1", &["Styrene-Like"]), Relationship::HasSubstrate),
                (molecule("CCCC", &["Unclassified"]), Relationship::HasProduct),
                (unknown, Relationship::HasProduct),
            ],
        );
        let report = score(&graph);
        assert_eq!(report.crs, Ratio::new(1.0, 3));
        // substrate and product present, catalyst and condition missing
        assert!((report.corpus_rcs - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.overall - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn product_can_be_required() {
        let evaluator = QualityEvaluator::new(QualityConfig {
            required_context: vec![ContextField::Product, ContextField::Product],
        });
        assert_eq!(evaluator.config().required_context.len(), 1);
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        let graph = graph_with(reaction, vec![(molecule("CCO", &["X"]), Relationship::HasProduct)]);
        assert_eq!(evaluator.score(&graph).corpus_rcs, 1.0);
    }

    #[test]
    fn summary_names_both_scores() {
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        let graph = graph_with(reaction, vec![(molecule("CCO", &["X"]), Relationship::HasSubstrate)]);
        let summary = score(&graph).to_string();
        assert!(summary.contains("reaction context (RCS)"));
        assert!(summary.contains("chemical resolution (CRS)"));
    }

    #[test]
    fn density_counts_non_paper_nodes() {
        let reaction = Node::new(NodeId::from("reaction:r"), NodeType::Reaction, "r");
        let graph = graph_with(reaction, vec![(molecule("CCO", &["X"]), Relationship::HasSubstrate)]);
        assert_eq!(score(&graph).knowledge_density, 2.0);
    }
}
