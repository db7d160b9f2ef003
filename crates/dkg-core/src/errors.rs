use crate::{contract::ContractError, state::Phase};
use dkg_crypto::{poly::PolyError, CryptoError};
use ethers::types::{Address, H256};
use thiserror::Error;
use tx_monitor::{LedgerError, ReceiptError};

/// Result type alias which returns `DkgError`
pub type DkgResult<A> = Result<A, DkgError>;

/// Result type alias which returns `TaskError`
pub type TaskResult<A> = Result<A, TaskError>;

#[derive(Debug, Error)]
/// Errors raised while reading or mutating the local protocol state
pub enum DkgError {
    /// A value which an earlier phase should have produced is absent
    #[error("state is missing {0}")]
    Missing(&'static str),

    /// The state is not in the phase the operation belongs to
    #[error("expected phase {expected:?}, state is in {actual:?}")]
    PhaseMismatch { expected: Phase, actual: Phase },

    /// Indices do not form a permutation of 1..N, or lengths disagree with N
    #[error("participant list is corrupted: {0}")]
    ParticipantList(String),

    #[error("unknown participant {0:?}")]
    UnknownParticipant(Address),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Poly(#[from] PolyError),
}

#[derive(Debug, Error)]
/// Errors of the persisted state store
pub enum StoreError {
    #[error("lmdb: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// BincodeError is raised when de(serialization) by bincode fails
    #[error("de(serialization) failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("in-memory store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
/// The classified error returned by every task operation. `is_recoverable`
/// tells the scheduler whether a later invocation may succeed.
pub enum TaskError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("contract: {0}")]
    Contract(ContractError),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("not leading yet")]
    NotLeading,

    #[error("already accused: {0:?}")]
    AlreadyAccused(Vec<Address>),

    #[error("transaction {0:?} is stale")]
    TxStale(H256),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("expected phase {expected:?}, found {actual:?}")]
    PhaseMismatch { expected: Phase, actual: Phase },

    #[error("invalid state: {0}")]
    State(String),

    #[error("participant list: {0}")]
    ParticipantList(String),

    #[error("transaction {0:?} was dropped")]
    TxDropped(H256),

    #[error("transaction {0:?} reverted")]
    TxReverted(H256),
}

impl TaskError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TaskError::Ledger(_)
                | TaskError::Contract(_)
                | TaskError::Timeout(_)
                | TaskError::NotLeading
                | TaskError::AlreadyAccused(_)
                | TaskError::TxStale(_)
        )
    }
}

impl From<DkgError> for TaskError {
    fn from(err: DkgError) -> Self {
        match err {
            DkgError::Crypto(err) => TaskError::Crypto(err),
            DkgError::Poly(err) => TaskError::Crypto(err.into()),
            DkgError::PhaseMismatch { expected, actual } => {
                TaskError::PhaseMismatch { expected, actual }
            }
            DkgError::ParticipantList(msg) => TaskError::ParticipantList(msg),
            err @ DkgError::UnknownParticipant(_) => TaskError::ParticipantList(err.to_string()),
            err @ DkgError::Missing(_) => TaskError::State(err.to_string()),
        }
    }
}

impl From<ContractError> for TaskError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::AlreadyAccused(targets) => TaskError::AlreadyAccused(targets),
            err => TaskError::Contract(err),
        }
    }
}

impl From<ReceiptError> for TaskError {
    fn from(err: ReceiptError) -> Self {
        match err {
            ReceiptError::Stale { hash, .. } => TaskError::TxStale(hash),
            ReceiptError::NotFound { hash, .. } => TaskError::TxDropped(hash),
            ReceiptError::AlreadyTracked(hash) => {
                TaskError::State(format!("transaction {:?} tracked twice", hash))
            }
            ReceiptError::Shutdown => TaskError::Ledger(LedgerError::Rpc(err.to_string())),
            ReceiptError::Ledger(err) => TaskError::Ledger(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let recoverable = [
            TaskError::NotLeading,
            TaskError::AlreadyAccused(vec![Address::zero()]),
            TaskError::Timeout("phase"),
            TaskError::TxStale(H256::zero()),
            ContractError::Transport("connection reset".into()).into(),
            LedgerError::Timeout.into(),
        ];
        for err in recoverable.iter() {
            assert!(err.is_recoverable(), "{}", err);
        }

        let fatal = [
            TaskError::from(CryptoError::ZeroScalar),
            DkgError::ParticipantList("index 3 appears twice".into()).into(),
            DkgError::PhaseMismatch {
                expected: Phase::KeyShareSubmission,
                actual: Phase::RegistrationOpen,
            }
            .into(),
            TaskError::TxDropped(H256::zero()),
            TaskError::TxReverted(H256::zero()),
        ];
        for err in fatal.iter() {
            assert!(!err.is_recoverable(), "{}", err);
        }
    }

    #[test]
    fn already_accused_from_contract_is_classified() {
        let err = TaskError::from(ContractError::AlreadyAccused(vec![Address::repeat_byte(1)]));
        assert!(matches!(err, TaskError::AlreadyAccused(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn receipt_errors_map_to_tx_outcomes() {
        let hash = H256::repeat_byte(9);
        assert!(matches!(
            TaskError::from(ReceiptError::Stale { hash, blocks: 4 }),
            TaskError::TxStale(h) if h == hash
        ));
        assert!(matches!(
            TaskError::from(ReceiptError::NotFound { hash, blocks: 40 }),
            TaskError::TxDropped(h) if h == hash
        ));
    }
}
