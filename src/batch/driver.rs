//! Parallel ingestion of independent records
//!
//! Workers run on tokio's blocking pool and pull records from a shared
//! cursor. The registry is the only shared mutable state. A wall-clock
//! budget or a cancelled token stops workers from taking further records;
//! whatever was committed before that point stays a valid graph.

use super::{BatchError, CancellationToken};
use crate::assemble::{GraphAssembler, ReactionEvidenceRecord};
use crate::registry::EntityRegistry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Worker count; zero means one per available core
    pub workers: usize,
    /// Wall-clock budget in seconds; none means unbounded
    pub budget_secs: Option<u64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            budget_secs: None,
        }
    }
}

impl BatchOptions {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget_secs.map(Duration::from_secs)
    }
}

/// What a batch run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub ingested: usize,
    pub skipped: usize,
    /// Records never handed to a worker
    pub not_submitted: usize,
    pub cancelled: bool,
    pub budget_exhausted: bool,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.not_submitted == 0
    }
}

#[derive(Debug, Default)]
struct WorkerTally {
    ingested: usize,
    skipped: usize,
}

/// Drives one assembler over many records
#[derive(Debug, Clone)]
pub struct BatchDriver {
    assembler: Arc<GraphAssembler>,
    registry: Arc<EntityRegistry>,
    options: BatchOptions,
    token: CancellationToken,
}

impl BatchDriver {
    pub fn new(assembler: Arc<GraphAssembler>, registry: Arc<EntityRegistry>, options: BatchOptions) -> Self {
        Self {
            assembler,
            registry,
            options,
            token: CancellationToken::new(),
        }
    }

    /// Share an externally owned token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn run(&self, records: Vec<ReactionEvidenceRecord>) -> Result<BatchOutcome, BatchError> {
        let started = Instant::now();
        let deadline = self.options.budget().map(|budget| started + budget);
        let total = records.len();
        let records = Arc::new(records);
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.options.worker_count().min(total.max(1));

        let mut join_set: JoinSet<WorkerTally> = JoinSet::new();
        for _ in 0..workers {
            let records = Arc::clone(&records);
            let cursor = Arc::clone(&cursor);
            let assembler = Arc::clone(&self.assembler);
            let registry = Arc::clone(&self.registry);
            let token = self.token.clone();

            join_set.spawn_blocking(move || {
                let mut tally = WorkerTally::default();
                loop {
                    if token.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(record) = records.get(index) else {
                        break;
                    };
                    match assembler.ingest(&registry, record) {
                        Ok(_) => tally.ingested += 1,
                        Err(_) => tally.skipped += 1,
                    }
                }
                tally
            });
        }

        let mut outcome = BatchOutcome {
            total,
            ..Default::default()
        };
        while let Some(joined) = join_set.join_next().await {
            let tally = joined.map_err(|e| BatchError::Worker(e.to_string()))?;
            outcome.ingested += tally.ingested;
            outcome.skipped += tally.skipped;
        }

        let submitted = cursor.load(Ordering::SeqCst).min(total);
        outcome.not_submitted = total - submitted;
        outcome.cancelled = self.token.is_cancelled() && !outcome.is_complete();
        outcome.budget_exhausted = !outcome.cancelled && !outcome.is_complete();
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        if outcome.is_complete() {
            info!(
                records = total,
                ingested = outcome.ingested,
                skipped = outcome.skipped,
                workers,
                elapsed_ms = outcome.elapsed_ms,
                "batch complete"
            );
        } else {
            warn!(
                records = total,
                ingested = outcome.ingested,
                not_submitted = outcome.not_submitted,
                cancelled = outcome.cancelled,
                "batch stopped early"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::RoleHint;

    fn records(n: usize) -> Vec<ReactionEvidenceRecord> {
        (0..n)
            .map(|i| {
                ReactionEvidenceRecord::new(format!("paper-{}.pdf", i % 3))
                    .with_location(format!("p{}", i))
                    .with_structure("C=Cc1ccccc1", RoleHint::Substrate)
                    .with_peptide("Ac-HLVFFAE")
            })
            .collect()
    }

    fn driver(workers: usize) -> (BatchDriver, Arc<EntityRegistry>) {
        let registry = Arc::new(EntityRegistry::new());
        let driver = BatchDriver::new(
            Arc::new(GraphAssembler::with_defaults()),
            Arc::clone(&registry),
            BatchOptions {
                workers,
                budget_secs: None,
            },
        );
        (driver, registry)
    }

    #[tokio::test]
    async fn ingests_every_record() {
        let (driver, registry) = driver(4);
        let outcome = driver.run(records(20)).await.unwrap();
        assert_eq!(outcome.ingested, 20);
        assert!(outcome.is_complete());
        assert_eq!(registry.count_of_type(crate::graph::NodeType::Reaction), 20);
        assert_eq!(registry.count_of_type(crate::graph::NodeType::Paper), 3);
        assert_eq!(registry.count_of_type(crate::graph::NodeType::Molecule), 1);
    }

    #[tokio::test]
    async fn cancelled_token_submits_nothing() {
        let (driver, registry) = driver(2);
        driver.cancellation_token().cancel();
        let outcome = driver.run(records(5)).await.unwrap();
        assert_eq!(outcome.not_submitted, 5);
        assert!(outcome.cancelled);
        assert_eq!(registry.node_count(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_complete() {
        let (driver, _) = driver(0);
        let outcome = driver.run(Vec::new()).await.unwrap();
        assert_eq!(outcome, BatchOutcome { elapsed_ms: outcome.elapsed_ms, ..Default::default() });
    }
}
