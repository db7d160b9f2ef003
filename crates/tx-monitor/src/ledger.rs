use crate::errors::LedgerError;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: H256,
}

/// A mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub block_hash: H256,
    /// false if the transaction reverted
    pub success: bool,
    pub gas_used: U256,
}

/// What the ledger knows about a transaction hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxLookup {
    Unknown,
    Pending,
    Mined(Receipt),
}

/// Options for read-only calls. Reads are pinned to a finalized block so that
/// they cannot be undone by a re-org.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOpts {
    pub from: Address,
    pub block: u64,
}

/// Options for signed transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOpts {
    pub from: Address,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl TxOpts {
    /// Returns a copy with both fee caps raised by `percent`, used when
    /// resubmitting a stale transaction
    pub fn bumped(&self, percent: u64) -> Self {
        let bump = |fee: U256| fee + fee * U256::from(percent) / U256::from(100u64);
        Self {
            from: self.from,
            max_fee_per_gas: bump(self.max_fee_per_gas),
            max_priority_fee_per_gas: bump(self.max_priority_fee_per_gas),
        }
    }
}

/// The subset of the layer-1 RPC surface the node relies on
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Height of the current head
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Height of the latest block which can no longer be re-orged
    async fn finalized_block_number(&self) -> Result<u64, LedgerError>;

    async fn block_header(&self, number: u64) -> Result<Option<BlockHeader>, LedgerError>;

    async fn transaction(&self, hash: H256) -> Result<TxLookup, LedgerError>;

    async fn call_opts(&self, account: Address) -> Result<CallOpts, LedgerError> {
        Ok(CallOpts {
            from: account,
            block: self.finalized_block_number().await?,
        })
    }

    async fn tx_opts(&self, account: Address) -> Result<TxOpts, LedgerError>;
}
