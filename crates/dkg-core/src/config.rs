use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local knobs of the DKG task engine. Phase lengths are not here: they are
/// announced on-chain when registration opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DkgConfig {
    /// Bound for a single contract read or ledger query
    pub call_timeout_ms: u64,
    /// Bound for signing and sending one transaction
    pub tx_timeout_ms: u64,
    /// Blocks into a leader-elected phase before more validators may submit
    pub desperation_delay: u64,
    /// Controls how fast the set of allowed submitters grows once desperate.
    /// Larger values widen the window more slowly.
    pub desperation_factor: u64,
    /// Percentage by which fees are raised when a transaction went stale
    pub fee_bump_percent: u64,
}

impl Default for DkgConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            tx_timeout_ms: 30_000,
            desperation_delay: 20,
            desperation_factor: 40,
            fee_bump_percent: 20,
        }
    }
}

impl DkgConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }
}
