//! Ingestion counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters, shared by all workers of one assembler
#[derive(Debug, Default)]
pub struct IngestStats {
    records_ingested: AtomicUsize,
    records_skipped: AtomicUsize,
    unresolved_entities: AtomicUsize,
    classification_misses: AtomicUsize,
    edges_rejected: AtomicUsize,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_ingested(&self) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn entity_unresolved(&self) {
        self.unresolved_entities.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn classification_missed(&self) {
        self.classification_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn edges_rejected(&self, count: usize) {
        self.edges_rejected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            unresolved_entities: self.unresolved_entities.load(Ordering::Relaxed),
            classification_misses: self.classification_misses.load(Ordering::Relaxed),
            edges_rejected: self.edges_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub records_ingested: usize,
    pub records_skipped: usize,
    pub unresolved_entities: usize,
    pub classification_misses: usize,
    pub edges_rejected: usize,
}

impl std::fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records ingested, {} skipped, {} unresolved entities, {} unclassified",
            self.records_ingested, self.records_skipped, self.unresolved_entities, self.classification_misses
        )
    }
}
