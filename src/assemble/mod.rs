//! Graph Assembler: one reaction-evidence record at a time into the registry
//!
//! For each record the assembler ensures the Paper node, creates the
//! Reaction node, canonicalizes, classifies and resolves every mention, and
//! links them with typed edges. Everything derived from one record is
//! committed as a single emission. Condition nodes follow the configured
//! [`ConditionPolicy`].

mod record;
mod stats;

pub use record::{ReactionEvidenceRecord, RoleHint, StructureMention};
pub use stats::{IngestStats, IngestSummary};

use crate::canonical::{condition_key, detect_kind, CanonicalEntity, Canonicalizer, EntityKind};
use crate::classify::{is_classified, PatternClassifier};
use crate::graph::{Edge, Node, NodeId, NodeType, PropertyValue, Relationship};
use crate::registry::{entity_node_id, unresolved_node_id, Emission, EntityRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a record was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record has no document id")]
    MissingDocumentId,

    #[error("record from {document_id} has no usable fields")]
    NoUsableFields { document_id: String },
}

/// How reaction conditions become graph nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionPolicy {
    /// Conditions stay attributes of the Reaction
    Inline,
    /// Every condition becomes a merged node with a `uses_condition` edge
    Resolve,
    /// A condition becomes a node once two distinct reactions report it
    #[default]
    Recurring,
}

/// Assembly options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    pub condition_policy: ConditionPolicy,
    /// Skip records that carry no mentions and no conditions
    pub skip_empty_records: bool,
    /// Keep only the first dot-separated fragment of structure strings
    pub first_fragment_only: bool,
    /// Structure strings shorter than this are ignored as noise
    pub min_structure_length: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            condition_policy: ConditionPolicy::default(),
            skip_empty_records: false,
            first_fragment_only: false,
            min_structure_length: 0,
        }
    }
}

struct Mention<'r> {
    raw: &'r str,
    kind: EntityKind,
    relationship: Relationship,
}

/// Record-at-a-time graph builder
///
/// Holds no graph state of its own: the registry is passed to every
/// [`ingest`](Self::ingest) call. One assembler may be shared by many
/// workers.
#[derive(Debug)]
pub struct GraphAssembler {
    classifier: Arc<PatternClassifier>,
    canonicalizer: Canonicalizer,
    options: AssemblyOptions,
    stats: IngestStats,
}

impl GraphAssembler {
    pub fn new(classifier: Arc<PatternClassifier>, options: AssemblyOptions) -> Self {
        Self {
            classifier,
            canonicalizer: Canonicalizer::new().with_first_fragment_only(options.first_fragment_only),
            options,
            stats: IngestStats::new(),
        }
    }

    /// Assembler with the built-in rule table and default options
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(PatternClassifier::with_default_rules()), AssemblyOptions::default())
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    pub fn stats(&self) -> IngestSummary {
        self.stats.summary()
    }

    /// Ingest one record. Returns the Reaction node id.
    ///
    /// A skipped record leaves the registry untouched.
    pub fn ingest(&self, registry: &EntityRegistry, record: &ReactionEvidenceRecord) -> Result<NodeId, RecordError> {
        match self.ingest_record(registry, record) {
            Ok(id) => {
                self.stats.record_ingested();
                Ok(id)
            }
            Err(err) => {
                self.stats.record_skipped();
                warn!(error = %err, location = ?record.location, "skipping record");
                Err(err)
            }
        }
    }

    fn ingest_record(&self, registry: &EntityRegistry, record: &ReactionEvidenceRecord) -> Result<NodeId, RecordError> {
        let document_id = record.document_id.trim();
        if document_id.is_empty() {
            return Err(RecordError::MissingDocumentId);
        }
        let usable = record.usable_field_count();
        let malformed = record.field_count() > 0 && usable == 0;
        if malformed || (self.options.skip_empty_records && usable == 0) {
            return Err(RecordError::NoUsableFields {
                document_id: document_id.to_string(),
            });
        }

        let paper = paper_node(document_id, record);
        let reaction_id = NodeId::from_string(format!("reaction:{}", record.fingerprint()));
        let conditions = normalized_conditions(record);
        let reaction = reaction_node(&reaction_id, document_id, record, &conditions);

        let mut emission = Emission::new().with_node(paper.clone()).with_node(reaction);
        emission.push_edge(Edge::new(paper.id.clone(), reaction_id.clone(), Relationship::Contains));

        for mention in self.mentions(record) {
            let entity = self.canonicalizer.resolve(mention.raw, mention.kind);
            let node = self.entity_node(&entity, &reaction_id, mention.relationship);
            emission.push_edge(Edge::new(reaction_id.clone(), node.id.clone(), mention.relationship));
            emission.push_node(node);
        }

        let condition_nodes: Vec<Node> = conditions
            .iter()
            .filter_map(|(name, value)| condition_node(name, value))
            .collect();
        if self.options.condition_policy == ConditionPolicy::Resolve {
            for node in &condition_nodes {
                emission.push_edge(Edge::new(reaction_id.clone(), node.id.clone(), Relationship::UsesCondition));
            }
            emission.nodes.extend(condition_nodes.iter().cloned());
        }

        let result = registry.commit(emission);
        if !result.is_fully_committed() {
            self.stats.edges_rejected(result.rejections.len());
            for rejection in &result.rejections {
                warn!(item = %rejection.description, reason = %rejection.reason, "edge rejected");
            }
        }

        if self.options.condition_policy == ConditionPolicy::Recurring {
            // Runs after the reaction is committed so every sighted reaction
            // already exists when its edge is emitted.
            for node in condition_nodes {
                let sighting = registry.record_condition_sighting(&node, &reaction_id);
                if sighting.reactions.len() < 2 {
                    continue;
                }
                let condition_id = sighting.node.id.clone();
                let mut linked = Emission::new().with_node(sighting.node);
                for reaction in sighting.reactions {
                    linked.push_edge(Edge::new(reaction, condition_id.clone(), Relationship::UsesCondition));
                }
                registry.commit(linked);
            }
        }

        debug!(
            reaction = %reaction_id,
            document = document_id,
            nodes_created = result.nodes_created,
            nodes_merged = result.nodes_merged,
            edges = result.edges_committed,
            "record ingested"
        );
        Ok(reaction_id)
    }

    fn mentions<'r>(&self, record: &'r ReactionEvidenceRecord) -> Vec<Mention<'r>> {
        let mut out = Vec::new();
        for structure in &record.structures {
            let raw = structure.value.trim();
            if raw.is_empty() {
                continue;
            }
            if raw.chars().count() < self.options.min_structure_length {
                debug!(raw, "structure shorter than minimum length, ignored");
                continue;
            }
            out.push(Mention {
                raw,
                kind: detect_kind(raw),
                relationship: structure.role_hint.relationship(),
            });
        }
        for peptide in &record.peptides {
            let raw = peptide.trim();
            if raw.is_empty() {
                continue;
            }
            out.push(Mention {
                raw,
                kind: EntityKind::Peptide,
                relationship: Relationship::CatalyzedBy,
            });
        }
        out
    }

    fn entity_node(&self, entity: &CanonicalEntity, reaction_id: &NodeId, relationship: Relationship) -> Node {
        let labels = self.classifier.classify(entity);
        match entity.key() {
            Some(key) => {
                if !is_classified(&labels) {
                    self.stats.classification_missed();
                }
                Node::new(entity_node_id(entity.kind, key), entity.kind.node_type(), key.as_str())
                    .with_evidence(entity.raw.as_str())
                    .with_role_labels(labels)
                    .with_property("label", key.as_str())
                    .with_property("kind", entity.kind.as_str())
            }
            None => {
                self.stats.entity_unresolved();
                debug!(raw = %entity.raw, kind = %entity.kind, "entity unresolved");
                let scope = format!("{}/{}", reaction_id, relationship);
                Node::new(
                    unresolved_node_id(entity.kind, &scope, &entity.raw),
                    entity.kind.node_type(),
                    entity.canonicalization.key_or_unknown(),
                )
                .with_evidence(entity.raw.as_str())
                .with_role_labels(labels)
                .with_property("label", entity.raw.as_str())
                .with_property("kind", entity.kind.as_str())
            }
        }
    }
}

fn paper_node(document_id: &str, record: &ReactionEvidenceRecord) -> Node {
    let mut node = Node::new(
        NodeId::from_string(format!("paper:{}", document_id)),
        NodeType::Paper,
        document_id,
    )
    .with_property("label", document_id)
    .with_property("document_id", document_id);
    if let Some(title) = record.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        node = node.with_property("title", title);
    }
    if let Some(source) = record.source_file.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        node = node.with_property("source_file", source);
    }
    node
}

/// Non-blank conditions with trimmed names and values
fn normalized_conditions(record: &ReactionEvidenceRecord) -> BTreeMap<String, String> {
    record
        .conditions
        .iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn reaction_node(
    id: &NodeId,
    document_id: &str,
    record: &ReactionEvidenceRecord,
    conditions: &BTreeMap<String, String>,
) -> Node {
    let reaction_types: Vec<String> = record
        .reaction_types
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let fingerprint = id.as_str().trim_start_matches("reaction:");

    let mut node = Node::new(id.clone(), NodeType::Reaction, fingerprint)
        .with_role_labels(reaction_types.clone())
        .with_property("label", record.reaction_label())
        .with_property("paper", document_id);
    if let Some(location) = record.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        node = node.with_evidence(location).with_property("location", location);
    }
    if !reaction_types.is_empty() {
        node = node.with_property(
            "reaction_types",
            PropertyValue::Array(reaction_types.into_iter().map(PropertyValue::String).collect()),
        );
    }
    if !conditions.is_empty() {
        node = node.with_property(
            "conditions",
            PropertyValue::Object(
                conditions
                    .iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::String(v.clone())))
                    .collect(),
            ),
        );
    }
    node
}

fn condition_node(name: &str, value: &str) -> Option<Node> {
    let key = condition_key(name, value)?;
    Some(
        Node::new(entity_node_id(EntityKind::Condition, &key), NodeType::Condition, key.as_str())
            .with_evidence(format!("{}: {}", name, value))
            .with_property("label", key.as_str())
            .with_property("name", name.trim().to_lowercase())
            .with_property("value", value.trim()),
    )
}
