use crate::{
    errors::{DkgError, DkgResult},
    math::{self, KeyShare, Proof, Scalar, G1, G2},
};
use dkg_crypto::{encryption::EncryptedShare, group::Element, poly::Idx, poly::Poly};
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The phases of a DKG run, in the order the contract walks through them
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    #[default]
    RegistrationOpen,
    ShareDistribution,
    DisputeShareDistribution,
    KeyShareSubmission,
    MPKSubmission,
    GPKJSubmission,
    DisputeGPKJSubmission,
    Completion,
}

/// Degree of every dealer's polynomial for a committee of `n` validators.
/// Any `threshold(n) + 1` shares recover the group secret.
pub fn threshold(n: u32) -> u32 {
    2 * n / 3
}

/// The kinds of accusation a validator can raise against another
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccusationKind {
    NotRegistered,
    DidNotDistributeShares,
    DistributedBadShares,
    DidNotSubmitKeyShare,
    DidNotSubmitGpkj,
    SubmittedBadGpkj,
}

/// What this validator has learned about another one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: Address,
    /// Base-1 index assigned at registration
    pub index: Idx,
    /// Transport key, used only to encrypt shares
    pub public_key: G1,
    /// Nonce and phase of the participant's latest action
    pub nonce: u64,
    pub phase: Phase,
    pub commitments: Vec<G1>,
    pub encrypted_shares: Vec<EncryptedShare>,
    pub distributed_shares_hash: H256,
    pub key_share_g1: G1,
    pub key_share_proof: Option<Proof>,
    pub key_share_g2: G2,
    pub gpkj: G2,
}

impl Participant {
    pub fn new(address: Address, index: Idx, public_key: G1, nonce: u64) -> Self {
        Self {
            address,
            index,
            public_key,
            nonce,
            phase: Phase::RegistrationOpen,
            commitments: Vec::new(),
            encrypted_shares: Vec::new(),
            distributed_shares_hash: H256::zero(),
            key_share_g1: G1::zero(),
            key_share_proof: None,
            key_share_g2: G2::zero(),
            gpkj: G2::zero(),
        }
    }

    /// Whether the participant's latest action happened in `phase` of run `nonce`
    pub fn acted_in(&self, nonce: u64, phase: Phase) -> bool {
        self.nonce == nonce && self.phase == phase
    }

    /// Whether the participant distributed shares during run `nonce`
    pub fn has_distributed(&self, nonce: u64) -> bool {
        self.nonce == nonce && !self.commitments.is_empty()
    }

    /// Dealers whose shares make up the group key: they distributed shares and
    /// then backed them with a key share
    pub fn is_qualified_dealer(&self, nonce: u64) -> bool {
        self.has_distributed(nonce) && !self.key_share_g1.is_zero()
    }
}

/// One validator's persisted view of the DKG run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgState {
    /// The local validator
    pub account: Address,

    pub phase: Phase,
    pub phase_start: u64,
    pub phase_length: u64,
    pub confirmation_length: u64,
    pub nonce: u64,

    /// Own index, 0 until registered
    pub index: Idx,
    pub number_of_validators: u32,
    pub validator_threshold: u32,

    pub transport_private_key: Option<Scalar>,
    pub transport_public_key: Option<G1>,

    /// Own polynomial; its free coefficient is the secret value
    pub private_coefficients: Option<Poly<Scalar>>,
    pub secret_value: Option<Scalar>,
    pub commitments: Vec<G1>,
    pub encrypted_shares: Vec<EncryptedShare>,

    pub key_share: Option<KeyShare>,
    pub master_public_key: Option<G2>,
    pub group_private_key: Option<Scalar>,
    pub group_public_key: Option<G2>,

    pub participants: BTreeMap<Address, Participant>,

    /// Targets computed by the dispute tasks, submitted on execution
    pub accusations: BTreeMap<AccusationKind, Vec<Address>>,

    /// Set once the contract announced the new validator set
    pub completed: bool,
}

impl DkgState {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            ..Default::default()
        }
    }

    /// End of the current phase window
    pub fn phase_end(&self) -> u64 {
        self.phase_start + self.phase_length
    }

    /// Fails with `PhaseMismatch` unless the state is in `expected`
    pub fn ensure_phase(&self, expected: Phase) -> DkgResult<()> {
        if self.phase != expected {
            return Err(DkgError::PhaseMismatch {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    pub fn participant(&self, address: &Address) -> DkgResult<&Participant> {
        self.participants
            .get(address)
            .ok_or(DkgError::UnknownParticipant(*address))
    }

    fn participant_mut(&mut self, address: &Address) -> DkgResult<&mut Participant> {
        self.participants
            .get_mut(address)
            .ok_or(DkgError::UnknownParticipant(*address))
    }

    /// Participants ordered by index. Fails if the indices are not exactly
    /// `1..=N`.
    pub fn participants_by_index(&self) -> DkgResult<Vec<&Participant>> {
        let mut list = self.participants.values().collect::<Vec<_>>();
        list.sort_by_key(|p| p.index);

        for (pos, participant) in list.iter().enumerate() {
            if participant.index as usize != pos + 1 {
                return Err(DkgError::ParticipantList(format!(
                    "expected index {} at position {}, found {}",
                    pos + 1,
                    pos,
                    participant.index
                )));
            }
        }
        if self.number_of_validators != 0 && list.len() != self.number_of_validators as usize {
            return Err(DkgError::ParticipantList(format!(
                "{} participants for {} validators",
                list.len(),
                self.number_of_validators
            )));
        }

        Ok(list)
    }

    /// Participants whose shares make up the group key
    pub fn qualified_dealers(&self) -> DkgResult<Vec<&Participant>> {
        Ok(self
            .participants_by_index()?
            .into_iter()
            .filter(|p| p.is_qualified_dealer(self.nonce))
            .collect())
    }

    fn open_phase(&mut self, phase: Phase, block: u64) {
        // wait for the triggering event to be final before acting on it
        self.phase = phase;
        self.phase_start = block + self.confirmation_length;
        debug!(?phase, start = self.phase_start, end = self.phase_end(), "phase opened");
    }

    /// A new run starts: everything learned about the previous one is dropped
    pub fn on_registration_opened(
        &mut self,
        block: u64,
        nonce: u64,
        phase_length: u64,
        confirmation_length: u64,
    ) {
        *self = Self {
            account: self.account,
            nonce,
            phase_length,
            confirmation_length,
            ..Default::default()
        };
        self.open_phase(Phase::RegistrationOpen, block);
    }

    pub fn on_address_registered(&mut self, address: Address, index: Idx, public_key: G1) {
        if address == self.account {
            self.index = index;
        }
        self.participants
            .insert(address, Participant::new(address, index, public_key, self.nonce));
    }

    pub fn on_registration_complete(&mut self, block: u64) {
        self.number_of_validators = self.participants.len() as u32;
        self.validator_threshold = threshold(self.number_of_validators);
        self.open_phase(Phase::ShareDistribution, block);
    }

    pub fn on_shares_distributed(
        &mut self,
        address: Address,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1>,
    ) -> DkgResult<()> {
        let hash = math::distributed_shares_hash(&encrypted_shares, &commitments)?;
        let nonce = self.nonce;
        let participant = self.participant_mut(&address)?;
        participant.encrypted_shares = encrypted_shares;
        participant.commitments = commitments;
        participant.distributed_shares_hash = hash;
        participant.nonce = nonce;
        participant.phase = Phase::ShareDistribution;
        Ok(())
    }

    pub fn on_share_distribution_complete(&mut self, block: u64) {
        self.open_phase(Phase::DisputeShareDistribution, block);
    }

    /// The dispute window closed without an event; key shares may be submitted
    /// from here on
    pub fn on_key_share_submission_opened(&mut self) {
        if self.phase == Phase::DisputeShareDistribution {
            self.phase = Phase::KeyShareSubmission;
            self.phase_start += self.phase_length;
        }
    }

    pub fn on_key_share_submitted(
        &mut self,
        address: Address,
        key_share_g1: G1,
        proof: Proof,
        key_share_g2: G2,
    ) -> DkgResult<()> {
        let nonce = self.nonce;
        let participant = self.participant_mut(&address)?;
        participant.key_share_g1 = key_share_g1;
        participant.key_share_proof = Some(proof);
        participant.key_share_g2 = key_share_g2;
        participant.nonce = nonce;
        participant.phase = Phase::KeyShareSubmission;
        Ok(())
    }

    pub fn on_key_share_submission_complete(&mut self, block: u64) {
        self.open_phase(Phase::MPKSubmission, block);
    }

    pub fn on_mpk_set(&mut self, block: u64, mpk: G2) {
        self.master_public_key = Some(mpk);
        self.open_phase(Phase::GPKJSubmission, block);
    }

    pub fn on_gpkj_submitted(&mut self, address: Address, gpkj: G2) -> DkgResult<()> {
        let nonce = self.nonce;
        let participant = self.participant_mut(&address)?;
        participant.gpkj = gpkj;
        participant.nonce = nonce;
        participant.phase = Phase::GPKJSubmission;
        Ok(())
    }

    pub fn on_gpkj_submission_complete(&mut self, block: u64) {
        self.open_phase(Phase::DisputeGPKJSubmission, block);
    }

    /// The gpkj dispute window closed; the run may be completed
    pub fn on_completion_opened(&mut self) {
        if self.phase == Phase::DisputeGPKJSubmission {
            self.phase = Phase::Completion;
            self.phase_start += self.phase_length;
        }
    }

    pub fn on_validator_set_completed(&mut self, block: u64) {
        self.completed = true;
        self.open_phase(Phase::Completion, block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::TaskContext, tasks::DkgTask};
    use dkg_crypto::group::Curve;
    use math::G1Curve;
    use serde::de::DeserializeOwned;
    use static_assertions::assert_impl_all;

    assert_impl_all!(DkgState: Serialize, DeserializeOwned, Clone, Send);
    assert_impl_all!(TaskContext: Send, Sync);
    assert_impl_all!(DkgTask: Send, Sync, Clone);

    #[test]
    fn threshold_table() {
        let table = [(4, 2), (5, 3), (6, 4), (7, 4), (8, 5), (9, 6)];
        for (n, t) in table.iter() {
            assert_eq!(threshold(*n), *t, "n = {}", n);
        }
        for n in 4..200 {
            assert_eq!(threshold(n), (2 * n) / 3);
            // more than two thirds are needed to recover
            assert!(3 * (threshold(n) + 1) > 2 * n);
        }
    }

    fn address(i: u8) -> Address {
        Address::repeat_byte(i)
    }

    fn registered(n: u8) -> DkgState {
        let mut state = DkgState::new(address(1));
        state.on_registration_opened(100, 1, 10, 2);
        for i in 1..=n {
            state.on_address_registered(address(i), i as Idx, G1Curve::commit(&Scalar::from_int(i as u64)));
        }
        state
    }

    use dkg_crypto::group::Scalar as _;

    #[test]
    fn fresh_state_awaits_registration() {
        assert_eq!(Phase::default(), Phase::RegistrationOpen);
        assert_eq!(DkgState::new(address(1)).phase, Phase::RegistrationOpen);
        assert!(Phase::RegistrationOpen < Phase::ShareDistribution);
    }

    #[test]
    fn windows_wait_for_confirmations() {
        let mut state = registered(4);
        assert_eq!(state.phase, Phase::RegistrationOpen);
        assert_eq!(state.phase_start, 102);
        assert_eq!(state.phase_end(), 112);

        state.on_registration_complete(110);
        assert_eq!(state.phase, Phase::ShareDistribution);
        assert_eq!(state.phase_start, 112);
        assert_eq!(state.number_of_validators, 4);
        assert_eq!(state.validator_threshold, 2);

        state.on_share_distribution_complete(120);
        assert_eq!(state.phase_start, 122);

        // the key share phase opens once the dispute window is over
        state.on_key_share_submission_opened();
        assert_eq!(state.phase, Phase::KeyShareSubmission);
        assert_eq!(state.phase_start, 132);
        state.on_key_share_submission_opened();
        assert_eq!(state.phase_start, 132);

        state.on_key_share_submission_complete(135);
        state.on_mpk_set(140, G2::one());
        assert_eq!(state.phase, Phase::GPKJSubmission);
        assert_eq!(state.phase_start, 142);
        assert_eq!(state.master_public_key, Some(G2::one()));
    }

    #[test]
    fn new_run_resets_state() {
        let mut state = registered(4);
        state.on_registration_complete(110);
        state.secret_value = Some(Scalar::from_int(5));
        assert_eq!(state.index, 1);

        state.on_registration_opened(300, 2, 20, 3);
        assert_eq!(state.account, address(1));
        assert_eq!(state.nonce, 2);
        assert_eq!(state.index, 0);
        assert!(state.participants.is_empty());
        assert!(state.secret_value.is_none());
        assert_eq!(state.phase_start, 303);
    }

    #[test]
    fn participant_indices_must_be_a_permutation() {
        let mut state = registered(4);
        assert_eq!(state.participants_by_index().unwrap().len(), 4);

        state.participants.get_mut(&address(3)).unwrap().index = 7;
        assert!(matches!(
            state.participants_by_index(),
            Err(DkgError::ParticipantList(_))
        ));
    }

    #[test]
    fn unknown_participant_is_rejected() {
        let mut state = registered(4);
        assert!(matches!(
            state.on_gpkj_submitted(address(9), G2::one()),
            Err(DkgError::UnknownParticipant(_))
        ));
    }

    #[test]
    fn state_survives_bincode() {
        let mut state = registered(4);
        state.on_registration_complete(110);
        state.secret_value = Some(Scalar::from_int(77));
        state
            .accusations
            .insert(AccusationKind::DidNotSubmitKeyShare, vec![address(2)]);

        let bytes = bincode::serialize(&state).unwrap();
        let decoded: DkgState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, state);
    }
}
