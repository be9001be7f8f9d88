//! End-to-end ingestion scenarios
//!
//! Each scenario ingests a handful of records through the public pipeline
//! and checks the resulting graph and its quality report.

mod common;

use common::{diazo_record, empty_record, hemin_record, unresolvable_record};
use rxngraph::{
    ConditionPolicy, EngineConfig, FindQuery, NodeType, Pipeline, Relationship, UNCLASSIFIED, UNKNOWN_KEY,
};

// === Scenario: diazo ester with peptide catalyst in water ===

#[test]
fn diazo_ester_record_is_fully_complete() {
    let pipeline = Pipeline::with_defaults();
    let reaction = pipeline.ingest(&diazo_record()).unwrap();
    let graph = pipeline.snapshot();

    let report = pipeline.score();
    assert_eq!(report.corpus_rcs, 1.0);
    assert_eq!(report.rcs.denominator, 1);

    let molecules: Vec<_> = graph.nodes_of_type(NodeType::Molecule).collect();
    assert_eq!(molecules.len(), 1);
    assert_ne!(molecules[0].canonical_key, UNKNOWN_KEY);
    assert_eq!(molecules[0].primary_label(), Some("Alpha-Diazo-Ester"));

    let peptides: Vec<_> = graph.targets(&reaction, Relationship::CatalyzedBy).collect();
    assert_eq!(peptides.len(), 1);
    assert_eq!(peptides[0].node_type, NodeType::Peptide);
    assert_eq!(peptides[0].canonical_key, "HLVFFAE");

    let papers: Vec<_> = graph.nodes_of_type(NodeType::Paper).collect();
    assert_eq!(papers.len(), 1);
    assert!(graph
        .targets(&papers[0].id, Relationship::Contains)
        .any(|r| r.id == reaction));

    assert_eq!(report.corpus_crs, 1.0);
}

// === Scenario: empty record ===

#[test]
fn empty_record_scores_zero_and_adds_no_entities() {
    let pipeline = Pipeline::with_defaults();
    pipeline.ingest(&empty_record()).unwrap();
    let graph = pipeline.snapshot();

    assert_eq!(graph.nodes_of_type(NodeType::Reaction).count(), 1);
    assert_eq!(graph.nodes_of_type(NodeType::Paper).count(), 1);
    assert!(graph.nodes.values().all(|n| !n.node_type.is_chemical_entity()));

    let report = pipeline.score();
    assert_eq!(report.corpus_rcs, 0.0);
    assert_eq!(report.reactions[0].missing.len(), 3);
    assert_eq!(report.crs.denominator, 0);
    assert_eq!(report.corpus_crs, 0.0);
}

// === Scenario: the same named catalyst in two documents ===

#[test]
fn shared_catalyst_resolves_to_one_molecule() {
    let pipeline = Pipeline::with_defaults();
    let first = pipeline.ingest(&hemin_record("paper-3.pdf")).unwrap();
    let second = pipeline.ingest(&hemin_record("paper-4.pdf")).unwrap();
    assert_ne!(first, second);

    let graph = pipeline.snapshot();
    let molecules: Vec<_> = graph.nodes_of_type(NodeType::Molecule).collect();
    assert_eq!(molecules.len(), 1);
    assert_eq!(molecules[0].canonical_key, "hemin");
    assert_eq!(molecules[0].primary_label(), Some("Heme-Like-Core"));
    assert_eq!(graph.nodes_of_type(NodeType::Reaction).count(), 2);
    assert_eq!(graph.nodes_of_type(NodeType::Paper).count(), 2);

    for reaction in [&first, &second] {
        let catalysts: Vec<_> = graph.targets(reaction, Relationship::CatalyzedBy).collect();
        assert_eq!(catalysts[0].id, molecules[0].id);
    }

    // pH 7.4 was reported twice, so the default policy promotes it.
    let conditions: Vec<_> = graph.nodes_of_type(NodeType::Condition).collect();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].canonical_key, "ph=7.4");
    assert_eq!(graph.targets(&first, Relationship::UsesCondition).count(), 1);
}

// === Scenario: unresolvable structures ===

#[test]
fn unresolvable_mentions_stay_separate_and_lower_crs() {
    let pipeline = Pipeline::with_defaults();
    pipeline.ingest(&unresolvable_record("paper-20.pdf")).unwrap();
    pipeline.ingest(&unresolvable_record("paper-21.pdf")).unwrap();

    let graph = pipeline.snapshot();
    let unknown: Vec<_> = graph.nodes.values().filter(|n| n.is_unknown()).collect();
    assert_eq!(unknown.len(), 4);
    assert!(unknown.iter().all(|n| n.role_labels == vec![UNCLASSIFIED.to_string()]));

    let report = pipeline.score();
    assert_eq!(report.crs.denominator, 4);
    assert_eq!(report.corpus_crs, 0.0);
    assert_eq!(pipeline.stats().unresolved_entities, 4);
}

// === Scenario: condition policies ===

#[test]
fn inline_policy_never_creates_condition_nodes() {
    let mut config = EngineConfig::default();
    config.assembly.condition_policy = ConditionPolicy::Inline;
    let pipeline = Pipeline::from_config(config).unwrap();
    pipeline.ingest(&hemin_record("paper-3.pdf")).unwrap();
    pipeline.ingest(&hemin_record("paper-4.pdf")).unwrap();

    let graph = pipeline.snapshot();
    assert_eq!(graph.nodes_of_type(NodeType::Condition).count(), 0);
    // Conditions still count toward completeness as attributes.
    assert!(pipeline
        .score()
        .reactions
        .iter()
        .all(|r| r.present.contains(&"condition".to_string())));
}

#[test]
fn role_labels_are_queryable() {
    let pipeline = Pipeline::with_defaults();
    pipeline.ingest(&diazo_record()).unwrap();
    pipeline.ingest(&hemin_record("paper-3.pdf")).unwrap();

    let carbene_precursors = pipeline.find(&FindQuery::new().with_role_label("Alpha-Diazo-Ester"));
    assert_eq!(carbene_precursors.total_count, 1);

    let amyloid = pipeline.find(
        &FindQuery::new()
            .with_node_type(NodeType::Peptide)
            .with_role_label("Amyloid-Core-Motif"),
    );
    assert_eq!(amyloid.keys(), vec!["HLVFFAE"]);
}
