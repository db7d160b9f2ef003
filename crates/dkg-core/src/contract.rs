use crate::{
    math::{Proof, G1, G2},
    state::Phase,
};
use async_trait::async_trait;
use dkg_crypto::{encryption::EncryptedShare, poly::Idx};
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tx_monitor::{CallOpts, TxOpts};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Some targets of an accusation were already evicted; carries those
    #[error("participants already accused: {0:?}")]
    AlreadyAccused(Vec<Address>),

    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("transport: {0}")]
    Transport(String),
}

/// What the contract stores about one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInternalState {
    pub index: Idx,
    pub nonce: u64,
    pub phase: Phase,
    pub public_key: G1,
    pub distributed_shares_hash: H256,
    pub commitments_first_coefficient: G1,
    pub key_share_g1: G1,
    pub key_share_g2: G2,
    pub gpkj: G2,
}

/// Evidence that a dealer sent us a share which does not match its
/// commitments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadSharesEvidence {
    pub dealer: Address,
    pub encrypted_shares: Vec<EncryptedShare>,
    pub commitments: Vec<G1>,
    /// Pairwise key between the accuser and the dealer
    pub shared_key: G1,
    /// Proves the key was derived from the accuser's transport key
    pub shared_key_proof: Proof,
}

/// Everything the contract needs to recompute a participant's expected GPKj
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadGpkjEvidence {
    /// Qualified dealers, by index
    pub dealers: Vec<Address>,
    pub encrypted_shares_hashes: Vec<H256>,
    pub commitments: Vec<Vec<G1>>,
    pub dishonest: Address,
}

/// The DKG contract. Reads are evaluated at the block of the given
/// `CallOpts`; writes return the hash of the submitted transaction.
#[async_trait]
pub trait DkgContract: Send + Sync {
    async fn phase(&self, opts: &CallOpts) -> Result<Phase, ContractError>;

    async fn nonce(&self, opts: &CallOpts) -> Result<u64, ContractError>;

    async fn participant_internal_state(
        &self,
        opts: &CallOpts,
        participant: Address,
    ) -> Result<ParticipantInternalState, ContractError>;

    /// Number of participants evicted during the current run
    async fn bad_participants(&self, opts: &CallOpts) -> Result<u64, ContractError>;

    async fn is_validator(&self, opts: &CallOpts, account: Address) -> Result<bool, ContractError>;

    async fn validators(&self, opts: &CallOpts) -> Result<Vec<Address>, ContractError>;

    /// Zero until the master public key was submitted
    async fn master_public_key(&self, opts: &CallOpts) -> Result<G2, ContractError>;

    async fn register(&self, opts: &TxOpts, public_key: G1) -> Result<H256, ContractError>;

    async fn distribute_shares(
        &self,
        opts: &TxOpts,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1>,
    ) -> Result<H256, ContractError>;

    async fn submit_key_share(
        &self,
        opts: &TxOpts,
        key_share_g1: G1,
        proof: Proof,
        key_share_g2: G2,
    ) -> Result<H256, ContractError>;

    async fn submit_master_public_key(&self, opts: &TxOpts, mpk: G2) -> Result<H256, ContractError>;

    async fn submit_gpkj(&self, opts: &TxOpts, gpkj: G2) -> Result<H256, ContractError>;

    async fn complete(&self, opts: &TxOpts) -> Result<H256, ContractError>;

    async fn accuse_participant_not_registered(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError>;

    async fn accuse_participant_did_not_distribute_shares(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError>;

    async fn accuse_participant_distributed_bad_shares(
        &self,
        opts: &TxOpts,
        evidence: BadSharesEvidence,
    ) -> Result<H256, ContractError>;

    async fn accuse_participant_did_not_submit_key_shares(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError>;

    async fn accuse_participant_did_not_submit_gpkj(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError>;

    async fn accuse_participant_submitted_bad_gpkj(
        &self,
        opts: &TxOpts,
        evidence: BadGpkjEvidence,
    ) -> Result<H256, ContractError>;
}
