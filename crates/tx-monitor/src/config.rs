use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs of the confirmation engine. Block counts are measured from the head
/// observed on the first poll after a transaction started being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the coordinator polls the ledger
    pub poll_interval_ms: u64,
    /// Upper bound for a single ledger query
    pub request_timeout_ms: u64,
    /// Blocks a transaction may stay unknown to the ledger before it is dropped
    pub tx_not_found_max_blocks: u64,
    /// Blocks a transaction may stay in the mempool before it is stale
    pub tx_max_stale_blocks: u64,
    /// Blocks a receipt must be buried under before it is reported
    pub tx_confirmation_blocks: u64,
    pub min_workers: usize,
    pub max_workers: usize,
    /// Transactions handed to a single worker per poll
    pub items_per_worker: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            request_timeout_ms: 5_000,
            tx_not_found_max_blocks: 50,
            tx_max_stale_blocks: 10,
            tx_confirmation_blocks: 6,
            min_workers: 1,
            max_workers: 8,
            items_per_worker: 4,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Number of workers to use for a batch of `batch` transactions
    pub fn workers_for(&self, batch: usize) -> usize {
        let wanted = (batch + self.items_per_worker.max(1) - 1) / self.items_per_worker.max(1);
        let max = self.max_workers.max(self.min_workers).max(1);
        wanted.clamp(self.min_workers.max(1), max).min(batch.max(1))
    }
}
