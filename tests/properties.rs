//! Graph-level properties that must hold for any corpus
//!
//! Merge idempotence, independence from ingestion order and worker count,
//! key determinism, isolation of unresolved entities, classification
//! completeness and score bounds.

mod common;

use common::{build_graph, diazo_record, mixed_corpus, structurally_equal};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rxngraph::canonical::canonicalize;
use rxngraph::{
    AssemblyOptions, BatchOptions, ConditionPolicy, EngineConfig, EntityKind, NodeType, Pipeline,
    QualityEvaluator, ReactionEvidenceRecord, RoleHint, UNKNOWN_KEY,
};
use std::collections::HashSet;

// === Idempotence ===

#[test]
fn reingesting_the_corpus_changes_nothing() {
    let corpus = mixed_corpus();
    let once = build_graph(&corpus, AssemblyOptions::default());

    let twice: Vec<_> = corpus.iter().chain(corpus.iter()).cloned().collect();
    let again = build_graph(&twice, AssemblyOptions::default());

    assert!(structurally_equal(&once, &again));
}

// === Order independence ===

#[test]
fn shuffled_ingestion_builds_the_same_graph() {
    for policy in [ConditionPolicy::Inline, ConditionPolicy::Resolve, ConditionPolicy::Recurring] {
        let options = AssemblyOptions {
            condition_policy: policy,
            ..Default::default()
        };
        let corpus = mixed_corpus();
        let reference = build_graph(&corpus, options.clone());

        for seed in 0..8u64 {
            let mut shuffled = corpus.clone();
            shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
            let graph = build_graph(&shuffled, options.clone());
            assert!(
                structurally_equal(&reference, &graph),
                "policy {:?}, seed {} produced a different graph",
                policy,
                seed
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_batch_matches_sequential_build() {
    let corpus = mixed_corpus();
    let sequential = build_graph(&corpus, AssemblyOptions::default());

    for workers in [1, 3, 8] {
        let config = EngineConfig {
            batch: BatchOptions {
                workers,
                budget_secs: None,
            },
            ..Default::default()
        };
        let pipeline = Pipeline::from_config(config).unwrap();
        let outcome = pipeline.ingest_batch(corpus.clone()).await.unwrap();
        assert!(outcome.is_complete());
        assert!(structurally_equal(&sequential, &pipeline.snapshot()));
    }
}

// === Key determinism ===

#[test]
fn equivalent_notations_share_one_key() {
    let spellings = ["C=Cc1ccccc1", "C=CC1=CC=CC=C1", "c1ccccc1C=C", " C = C c 1 c c c c c 1 "];
    let keys: HashSet<String> = spellings
        .iter()
        .map(|s| canonicalize(s, EntityKind::Structure).key_or_unknown().to_string())
        .collect();
    assert_eq!(keys.len(), 1);
    assert!(!keys.contains(UNKNOWN_KEY));

    let peptides = ["Ac-HLVFFAE", "H-His-Leu-Val-Phe-Phe-Ala-Glu-OH", "hlvffae"];
    let keys: HashSet<String> = peptides
        .iter()
        .map(|s| canonicalize(s, EntityKind::Peptide).key_or_unknown().to_string())
        .collect();
    assert_eq!(keys, HashSet::from(["HLVFFAE".to_string()]));
}

// === Unknown isolation ===

#[test]
fn unknown_entities_never_merge_across_records() {
    let graph = build_graph(&mixed_corpus(), AssemblyOptions::default());
    let unknown: Vec<_> = graph.nodes.values().filter(|n| n.is_unknown()).collect();
    assert_eq!(unknown.len(), 4);

    let ids: HashSet<_> = unknown.iter().map(|n| &n.id).collect();
    assert_eq!(ids.len(), unknown.len());
    for node in unknown {
        assert_eq!(node.evidence.len(), 1, "{} absorbed evidence from elsewhere", node.id);
    }
}

#[test]
fn resolved_keys_are_unique_per_type() {
    let graph = build_graph(&mixed_corpus(), AssemblyOptions::default());
    let mut seen = HashSet::new();
    for node in graph.nodes.values().filter(|n| n.node_type.is_chemical_entity() && !n.is_unknown()) {
        assert!(seen.insert((node.node_type, node.canonical_key.clone())));
    }
}

#[test]
fn same_key_in_different_kinds_stays_apart() {
    let record = ReactionEvidenceRecord::new("paper-x.pdf")
        .with_structure("CCC", RoleHint::Substrate)
        .with_peptide("C-C-C");
    let graph = build_graph(&[record], AssemblyOptions::default());

    let molecule = graph.nodes_of_type(NodeType::Molecule).find(|n| n.canonical_key == "CCC");
    let peptide = graph.nodes_of_type(NodeType::Peptide).find(|n| n.canonical_key == "CCC");
    let (molecule, peptide) = (molecule.expect("molecule node"), peptide.expect("peptide node"));
    assert_ne!(molecule.id, peptide.id);
}

#[test]
fn kekule_and_aromatic_mentions_share_one_node() {
    let records = [
        ReactionEvidenceRecord::new("paper-a.pdf").with_structure("CN1C=NC2=C1C(=O)N(C)C(=O)N2C", RoleHint::Product),
        ReactionEvidenceRecord::new("paper-b.pdf").with_structure("Cn1cnc2c1c(=O)n(C)c(=O)n2C", RoleHint::Product),
    ];
    let graph = build_graph(&records, AssemblyOptions::default());

    let molecules: Vec<_> = graph.nodes_of_type(NodeType::Molecule).filter(|n| !n.is_unknown()).collect();
    assert_eq!(molecules.len(), 1);
    assert_eq!(molecules[0].evidence.len(), 2);
}

#[test]
fn long_chain_mentions_resolve() {
    let chain = "C".repeat(20_000);
    let record = ReactionEvidenceRecord::new("paper-poly.pdf").with_structure(chain.as_str(), RoleHint::Substrate);
    let graph = build_graph(&[record], AssemblyOptions::default());

    let molecule = graph.nodes_of_type(NodeType::Molecule).next().expect("molecule node");
    assert_eq!(molecule.canonical_key, chain);
}

// === Classification completeness ===

#[test]
fn every_entity_carries_a_role_label() {
    let graph = build_graph(&mixed_corpus(), AssemblyOptions::default());
    for node in graph.nodes.values().filter(|n| n.node_type.is_chemical_entity()) {
        assert!(!node.role_labels.is_empty(), "{} has no role label", node.id);
    }
}

// === Score bounds ===

#[test]
fn scores_stay_within_unit_interval() {
    let graph = build_graph(&mixed_corpus(), AssemblyOptions::default());
    let report = QualityEvaluator::default().score(&graph);

    for reaction in &report.reactions {
        assert!((0.0..=1.0).contains(&reaction.rcs));
    }
    for entity in &report.entities {
        assert!(entity.crs == 0.0 || entity.crs == 1.0);
    }
    assert!((0.0..=1.0).contains(&report.corpus_rcs));
    assert!((0.0..=1.0).contains(&report.corpus_crs));
    assert!((0.0..=1.0).contains(&report.overall));
    assert_eq!(report.rcs.denominator, graph.nodes_of_type(NodeType::Reaction).count());
}

#[test]
fn duplicate_evidence_maps_to_one_reaction() {
    let graph = build_graph(&[diazo_record(), diazo_record()], AssemblyOptions::default());
    assert_eq!(graph.nodes_of_type(NodeType::Reaction).count(), 1);
}
