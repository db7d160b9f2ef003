use ethers::types::H256;
use thiserror::Error;

/// Failures while talking to the ledger. All of them are transient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("ledger request timed out")]
    Timeout,

    /// The node answered but left out something we need
    #[error("ledger response is missing `{0}`")]
    MissingField(&'static str),
}

/// The terminal outcome of tracking a transaction, when it is not a receipt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// The ledger never saw the transaction. It has to be signed again with a
    /// fresh nonce.
    #[error("transaction {hash:?} not found after {blocks} blocks")]
    NotFound { hash: H256, blocks: u64 },

    /// The transaction sat in the mempool too long. Resubmitting it with a
    /// higher fee should get it mined.
    #[error("transaction {hash:?} pending for {blocks} blocks")]
    Stale { hash: H256, blocks: u64 },

    #[error("transaction {0:?} is already being tracked")]
    AlreadyTracked(H256),

    #[error("transaction monitor is shut down")]
    Shutdown,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReceiptError {
    /// Whether the caller may retry without building a new transaction
    pub fn is_recoverable(&self) -> bool {
        match self {
            ReceiptError::Stale { .. } | ReceiptError::Ledger(_) | ReceiptError::Shutdown => true,
            ReceiptError::NotFound { .. } | ReceiptError::AlreadyTracked(_) => false,
        }
    }
}
