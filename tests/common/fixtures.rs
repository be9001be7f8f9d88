//! Reaction-evidence fixtures

use rxngraph::{
    AssemblyOptions, EntityRegistry, GraphAssembler, KnowledgeGraph, PatternClassifier, ReactionEvidenceRecord,
    RoleHint,
};
use std::sync::Arc;

/// Ethyl azidoacetate substrate, amyloid peptide catalyst, water.
pub fn diazo_record() -> ReactionEvidenceRecord {
    ReactionEvidenceRecord::new("paper-1.pdf")
        .with_location("p3")
        .with_structure("CCOC(=O)CN=[N+]=[N-]", RoleHint::Substrate)
        .with_peptide("Ac-HLVFFAE")
        .with_condition("solvent", "water")
        .with_reaction_type("Cyclopropanation")
}

/// A record that names a document and nothing else.
pub fn empty_record() -> ReactionEvidenceRecord {
    ReactionEvidenceRecord::new("paper-2.pdf")
}

/// Hemin as catalyst, reported by `document_id`.
pub fn hemin_record(document_id: &str) -> ReactionEvidenceRecord {
    ReactionEvidenceRecord::new(document_id)
        .with_location("p1")
        .with_structure("Hemin", RoleHint::Catalyst)
        .with_condition("pH", "7.4")
}

/// A record whose structure strings cannot be resolved.
pub fn unresolvable_record(document_id: &str) -> ReactionEvidenceRecord {
    ReactionEvidenceRecord::new(document_id)
        .with_structure("unknown", RoleHint::Product)
        .with_structure("C1CC(", RoleHint::Substrate)
}

/// Twenty-odd records over a handful of papers with shared entities,
/// shared conditions, unresolvable mentions and one exact duplicate.
pub fn mixed_corpus() -> Vec<ReactionEvidenceRecord> {
    let mut records = vec![diazo_record(), empty_record(), hemin_record("paper-3.pdf"), hemin_record("paper-4.pdf")];
    let substrates = ["C=Cc1ccccc1", "C=CC(=O)OC", "C1CC1C(=O)O", "Nc1ccccc1", "O=Cc1ccccc1", "CCCC"];
    for (i, substrate) in substrates.iter().enumerate() {
        records.push(
            ReactionEvidenceRecord::new(format!("paper-{}.pdf", 10 + i % 3))
                .with_location(format!("p{}", i + 1))
                .with_structure(*substrate, RoleHint::Substrate)
                .with_structure("CCOC(=O)C=[N+]=[N-]", RoleHint::Substrate)
                .with_peptide(if i % 2 == 0 { "Ac-KLVFFAE-NH2" } else { "H-His-Leu-Val-Phe-Phe-OH" })
                .with_condition("solvent", if i % 2 == 0 { "water" } else { "Water " })
                .with_condition("temperature", format!("{} C", 20 + i)),
        );
    }
    records.push(unresolvable_record("paper-20.pdf"));
    records.push(unresolvable_record("paper-21.pdf"));
    records.push(
        ReactionEvidenceRecord::new("paper-22.pdf")
            .with_structure("C=CC1=CC=CC=C1", RoleHint::Product)
            .with_structure("Congo Red", RoleHint::Catalyst),
    );
    records.push(diazo_record());
    records
}

/// Ingest `records` in order into a fresh registry.
pub fn build_graph(records: &[ReactionEvidenceRecord], options: AssemblyOptions) -> KnowledgeGraph {
    let registry = EntityRegistry::new();
    let assembler = GraphAssembler::new(Arc::new(PatternClassifier::with_default_rules()), options);
    for record in records {
        let _ = assembler.ingest(&registry, record);
    }
    registry.snapshot()
}

/// Same nodes and edges; snapshot metadata is ignored.
pub fn structurally_equal(a: &KnowledgeGraph, b: &KnowledgeGraph) -> bool {
    a.nodes == b.nodes && a.edges == b.edges
}
