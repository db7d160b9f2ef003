//! Turns the contract's events into state transitions and the tasks which
//! follow from them.
use crate::{
    errors::{DkgResult, TaskResult},
    math::{Proof, G1, G2},
    state::{AccusationKind, DkgState},
    store::DkgStore,
    tasks::{
        BlockWindow, CompletionTask, DisputeBadSharesTask, DisputeGpkjTask, DisputeMissingTask,
        DkgTask, GpkjSubmissionTask, KeyShareSubmissionTask, MpkSubmissionTask, RegisterTask,
        ShareDistributionTask,
    },
};
use dkg_crypto::{encryption::EncryptedShare, poly::Idx};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The events emitted by the DKG contract. Phase-changing events carry the
/// block they were mined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DkgEvent {
    RegistrationOpened {
        block: u64,
        nonce: u64,
        phase_length: u64,
        confirmation_length: u64,
    },
    AddressRegistered {
        nonce: u64,
        account: Address,
        index: Idx,
        public_key: G1,
    },
    RegistrationComplete {
        block: u64,
        nonce: u64,
    },
    SharesDistributed {
        nonce: u64,
        account: Address,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1>,
    },
    ShareDistributionComplete {
        block: u64,
        nonce: u64,
    },
    KeyShareSubmitted {
        nonce: u64,
        account: Address,
        key_share_g1: G1,
        proof: Proof,
        key_share_g2: G2,
    },
    KeyShareSubmissionComplete {
        block: u64,
        nonce: u64,
    },
    MpkSet {
        block: u64,
        nonce: u64,
        mpk: G2,
    },
    GpkjSubmitted {
        nonce: u64,
        account: Address,
        gpkj: G2,
    },
    GpkjSubmissionComplete {
        block: u64,
        nonce: u64,
    },
    ValidatorSetCompleted {
        block: u64,
        nonce: u64,
    },
}

impl DkgEvent {
    pub fn nonce(&self) -> u64 {
        match self {
            DkgEvent::RegistrationOpened { nonce, .. }
            | DkgEvent::AddressRegistered { nonce, .. }
            | DkgEvent::RegistrationComplete { nonce, .. }
            | DkgEvent::SharesDistributed { nonce, .. }
            | DkgEvent::ShareDistributionComplete { nonce, .. }
            | DkgEvent::KeyShareSubmitted { nonce, .. }
            | DkgEvent::KeyShareSubmissionComplete { nonce, .. }
            | DkgEvent::MpkSet { nonce, .. }
            | DkgEvent::GpkjSubmitted { nonce, .. }
            | DkgEvent::GpkjSubmissionComplete { nonce, .. }
            | DkgEvent::ValidatorSetCompleted { nonce, .. } => *nonce,
        }
    }
}

/// The `i`-th phase-length window after the current phase start
fn window(state: &DkgState, i: u64) -> BlockWindow {
    let start = state.phase_start + i * state.phase_length;
    BlockWindow::new(start, start + state.phase_length)
}

/// Applies `event` to `state` and returns the tasks it schedules. Events of
/// another run are ignored, except for a registration opening with a new
/// nonce, which resets the state.
pub fn process_event(state: &mut DkgState, event: DkgEvent) -> DkgResult<Vec<DkgTask>> {
    let nonce = event.nonce();
    let is_opening = matches!(event, DkgEvent::RegistrationOpened { .. });
    if nonce != state.nonce && !(is_opening && nonce > state.nonce) {
        debug!(nonce, current = state.nonce, "ignoring event of another run");
        return Ok(Vec::new());
    }
    if is_opening && nonce == state.nonce {
        debug!(nonce, "registration already opened");
        return Ok(Vec::new());
    }

    let tasks = match event {
        DkgEvent::RegistrationOpened {
            block,
            nonce,
            phase_length,
            confirmation_length,
        } => {
            state.on_registration_opened(block, nonce, phase_length, confirmation_length);
            info!(nonce, start = state.phase_start, "registration opened");
            vec![
                DkgTask::Register(RegisterTask::new(window(state, 0))),
                DkgTask::DisputeMissing(DisputeMissingTask::new(
                    AccusationKind::NotRegistered,
                    window(state, 1),
                )),
            ]
        }
        DkgEvent::AddressRegistered {
            account,
            index,
            public_key,
            ..
        } => {
            state.on_address_registered(account, index, public_key);
            Vec::new()
        }
        DkgEvent::RegistrationComplete { block, .. } => {
            state.on_registration_complete(block);
            info!(
                validators = state.number_of_validators,
                threshold = state.validator_threshold,
                "registration complete"
            );
            vec![
                DkgTask::ShareDistribution(ShareDistributionTask::new(window(state, 0))),
                DkgTask::DisputeMissing(DisputeMissingTask::new(
                    AccusationKind::DidNotDistributeShares,
                    window(state, 1),
                )),
            ]
        }
        DkgEvent::SharesDistributed {
            account,
            encrypted_shares,
            commitments,
            ..
        } => {
            state.on_shares_distributed(account, encrypted_shares, commitments)?;
            Vec::new()
        }
        DkgEvent::ShareDistributionComplete { block, .. } => {
            state.on_share_distribution_complete(block);
            vec![
                DkgTask::DisputeShareDistribution(DisputeBadSharesTask::new(window(state, 0))),
                DkgTask::KeyShareSubmission(KeyShareSubmissionTask::new(window(state, 1))),
                DkgTask::DisputeMissing(DisputeMissingTask::new(
                    AccusationKind::DidNotSubmitKeyShare,
                    window(state, 2),
                )),
            ]
        }
        DkgEvent::KeyShareSubmitted {
            account,
            key_share_g1,
            proof,
            key_share_g2,
            ..
        } => {
            state.on_key_share_submitted(account, key_share_g1, proof, key_share_g2)?;
            Vec::new()
        }
        DkgEvent::KeyShareSubmissionComplete { block, .. } => {
            state.on_key_share_submission_complete(block);
            vec![DkgTask::MpkSubmission(MpkSubmissionTask::new(window(
                state, 0,
            )))]
        }
        DkgEvent::MpkSet { block, mpk, .. } => {
            state.on_mpk_set(block, mpk);
            vec![
                DkgTask::GpkjSubmission(GpkjSubmissionTask::new(window(state, 0))),
                DkgTask::DisputeMissing(DisputeMissingTask::new(
                    AccusationKind::DidNotSubmitGpkj,
                    window(state, 1),
                )),
            ]
        }
        DkgEvent::GpkjSubmitted { account, gpkj, .. } => {
            state.on_gpkj_submitted(account, gpkj)?;
            Vec::new()
        }
        DkgEvent::GpkjSubmissionComplete { block, .. } => {
            state.on_gpkj_submission_complete(block);
            vec![
                DkgTask::DisputeGpkj(DisputeGpkjTask::new(window(state, 0))),
                DkgTask::Completion(CompletionTask::new(window(state, 1))),
            ]
        }
        DkgEvent::ValidatorSetCompleted { block, .. } => {
            state.on_validator_set_completed(block);
            info!(nonce, "validator set completed");
            Vec::new()
        }
    };

    for task in tasks.iter() {
        let window = task.window();
        debug!(task = task.name(), start = window.start, end = window.end, "scheduled");
    }
    Ok(tasks)
}

/// Applies `event` to the persisted state in a single update
pub fn apply_event(store: &DkgStore, event: DkgEvent) -> TaskResult<Vec<DkgTask>> {
    store.update(|state| -> TaskResult<Vec<DkgTask>> { Ok(process_event(state, event)?) })
}
