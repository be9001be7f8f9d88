//! rxngraph: reaction knowledge graph engine
//!
//! Turns reaction-evidence records extracted from scientific documents into
//! a typed, deduplicated knowledge graph of papers, reactions, molecules,
//! peptides and conditions, and scores how complete and well-resolved that
//! graph is.
//!
//! # Core Concepts
//!
//! - **Canonicalization**: raw structure, peptide, name and condition strings
//!   become canonical keys, or explicitly `Unresolved`
//! - **Classification**: an ordered rule table assigns structural role labels
//! - **Registry**: a concurrent map that merges entities by canonical key
//! - **Quality**: Reaction Context Score (RCS) and Chemical Resolution (CRS)
//!
//! # Example
//!
//! ```
//! use rxngraph::{Pipeline, ReactionEvidenceRecord, RoleHint};
//!
//! let pipeline = Pipeline::with_defaults();
//! pipeline
//!     .ingest(
//!         &ReactionEvidenceRecord::new("paper-1.pdf")
//!             .with_structure("CCOC(=O)C=[N+]=[N-]", RoleHint::Substrate)
//!             .with_peptide("Ac-HLVFFAE")
//!             .with_condition("solvent", "water"),
//!     )
//!     .unwrap();
//! assert_eq!(pipeline.score().corpus_rcs, 1.0);
//! ```

pub mod assemble;
pub mod batch;
pub mod canonical;
pub mod classify;
pub mod config;
pub mod export;
mod graph;
mod pipeline;
pub mod quality;
pub mod query;
pub mod registry;

pub use assemble::{
    AssemblyOptions, ConditionPolicy, GraphAssembler, IngestSummary, ReactionEvidenceRecord, RecordError,
    RoleHint, StructureMention,
};
pub use batch::{BatchDriver, BatchError, BatchOptions, BatchOutcome, CancellationToken};
pub use canonical::{CanonicalEntity, CanonicalKey, Canonicalization, Canonicalizer, EntityKind};
pub use classify::{PatternClassifier, RuleSpec, TieBreak, UNCLASSIFIED};
pub use config::{ConfigError, EngineConfig};
pub use export::{ExportError, ExportFormat};
pub use graph::{
    Edge, GraphMetadata, KnowledgeGraph, Node, NodeId, NodeType, Properties, PropertyValue, Relationship,
    UNKNOWN_KEY,
};
pub use pipeline::{PathIngest, Pipeline};
pub use quality::{QualityConfig, QualityEvaluator, QualityReport};
pub use query::{FindQuery, QueryResult};
pub use registry::EntityRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
