//! Stop signal shared by the batch driver and its callers
//!
//! Workers look at the token before claiming the next record. A record that
//! is already being ingested runs to its commit, so the registry only ever
//! holds whole records. The CLI trips the token on Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag for a batch run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether workers should stop claiming records
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Stop the batch after the records in flight. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}
