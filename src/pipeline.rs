//! Single entry point for building, scoring and exporting a reaction graph.
//!
//! `Pipeline` owns one registry and one assembler. Callers ingest records
//! one at a time or in batches, then take snapshots to query, score or
//! export. Snapshots are owned copies; ingestion can continue afterwards.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::{GraphAssembler, IngestSummary, ReactionEvidenceRecord, RecordError};
use crate::batch::{load_path, BatchDriver, BatchError, BatchOutcome, CancellationToken};
use crate::classify::PatternClassifier;
use crate::config::{ConfigError, EngineConfig};
use crate::export::{save_graph, ExportError, ExportFormat};
use crate::graph::{KnowledgeGraph, NodeId};
use crate::quality::{QualityEvaluator, QualityReport};
use crate::query::{FindQuery, QueryResult};
use crate::registry::{EntityRegistry, Rejection};

/// Result of ingesting a file or directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathIngest {
    pub files_read: usize,
    pub files_failed: usize,
    pub malformed_records: usize,
    pub outcome: BatchOutcome,
}

pub struct Pipeline {
    config: EngineConfig,
    assembler: Arc<GraphAssembler>,
    registry: Arc<EntityRegistry>,
    evaluator: QualityEvaluator,
    token: CancellationToken,
}

impl Pipeline {
    pub fn new(config: EngineConfig, classifier: PatternClassifier) -> Self {
        let assembler = GraphAssembler::new(Arc::new(classifier), config.assembly.clone());
        Self {
            evaluator: QualityEvaluator::new(config.quality.clone()),
            assembler: Arc::new(assembler),
            registry: Arc::new(EntityRegistry::new()),
            token: CancellationToken::new(),
            config,
        }
    }

    /// Build from configuration, compiling its rule table.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let classifier = config.build_classifier()?;
        Ok(Self::new(config, classifier))
    }

    /// Built-in rules and default options
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), PatternClassifier::with_default_rules())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &PatternClassifier {
        self.assembler.classifier()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Token that stops batch ingestion when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    // --- Write ---

    pub fn ingest(&self, record: &ReactionEvidenceRecord) -> Result<NodeId, RecordError> {
        self.assembler.ingest(&self.registry, record)
    }

    pub async fn ingest_batch(&self, records: Vec<ReactionEvidenceRecord>) -> Result<BatchOutcome, BatchError> {
        BatchDriver::new(
            Arc::clone(&self.assembler),
            Arc::clone(&self.registry),
            self.config.batch.clone(),
        )
        .with_cancellation(self.token.clone())
        .run(records)
        .await
    }

    /// Load every record file under `path` and ingest them in parallel.
    pub async fn ingest_path(&self, path: &Path) -> Result<PathIngest, BatchError> {
        let loaded = load_path(path)?;
        info!(
            path = %path.display(),
            files = loaded.files_read,
            records = loaded.records.len(),
            "ingesting"
        );
        let outcome = self.ingest_batch(loaded.records).await?;
        Ok(PathIngest {
            files_read: loaded.files_read,
            files_failed: loaded.files_failed,
            malformed_records: loaded.malformed,
            outcome,
        })
    }

    /// Merge an independently built graph.
    pub fn absorb(&self, graph: &KnowledgeGraph) -> Vec<Rejection> {
        self.registry.absorb(graph)
    }

    // --- Read ---

    pub fn snapshot(&self) -> KnowledgeGraph {
        self.registry.snapshot()
    }

    pub fn stats(&self) -> IngestSummary {
        self.assembler.stats()
    }

    pub fn find(&self, query: &FindQuery) -> QueryResult {
        query.execute(&self.snapshot())
    }

    pub fn score(&self) -> QualityReport {
        self.evaluator.score(&self.snapshot())
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<KnowledgeGraph, ExportError> {
        let graph = self.snapshot();
        save_graph(&graph, path, format)?;
        info!(
            path = %path.display(),
            format = %format,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph exported"
        );
        Ok(graph)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::RoleHint;
    use crate::graph::NodeType;

    #[test]
    fn ingest_then_find_by_role_label() {
        let pipeline = Pipeline::with_defaults();
        pipeline
            .ingest(
                &ReactionEvidenceRecord::new("paper-1.pdf")
                    .with_structure("C=CC1=CC=CC=C1", RoleHint::Substrate)
                    .with_peptide("Ac-HLVFFAE"),
            )
            .unwrap();

        let styrenes = pipeline.find(
            &FindQuery::new()
                .with_node_type(NodeType::Molecule)
                .with_role_label("Styrene-Like"),
        );
        let expected = crate::canonical::canonicalize("C=Cc1ccccc1", crate::canonical::EntityKind::Structure);
        assert_eq!(styrenes.nodes.len(), 1);
        assert_eq!(Some(styrenes.keys()[0]), expected.key().map(|k| k.as_str()));
        assert_eq!(pipeline.stats().records_ingested, 1);
    }

    #[test]
    fn from_config_applies_quality_settings() {
        let config = EngineConfig::from_yaml_str("quality:\n  required_context: [substrate]\n").unwrap();
        let pipeline = Pipeline::from_config(config).unwrap();
        pipeline
            .ingest(&ReactionEvidenceRecord::new("d").with_structure("CCO", RoleHint::Substrate))
            .unwrap();
        assert_eq!(pipeline.score().corpus_rcs, 1.0);
    }

    #[tokio::test]
    async fn ingest_path_reports_malformed_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("records.jsonl"),
            "{\"document_id\": \"a\", \"peptides\": [\"KLVFF\"]}\n{\"peptides\": []}\n",
        )
        .unwrap();

        let pipeline = Pipeline::with_defaults();
        let result = pipeline.ingest_path(dir.path()).await.unwrap();
        assert_eq!(result.files_read, 1);
        assert_eq!(result.malformed_records, 1);
        assert_eq!(result.outcome.ingested, 1);
    }
}
