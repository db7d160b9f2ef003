//! An in-memory chain running the DKG contract, and a committee of validators
//! wired to it.
use crate::{
    config::DkgConfig,
    context::TaskContext,
    contract::{BadGpkjEvidence, BadSharesEvidence, ContractError, DkgContract, ParticipantInternalState},
    errors::{DkgError, TaskResult},
    events::{apply_event, DkgEvent},
    math::{self, Bls12, G1Curve, KeyShare, Proof, G1, G2},
    runner::run_task,
    state::{threshold, Phase},
    store::DkgStore,
    tasks::DkgTask,
};
use async_trait::async_trait;
use dkg_crypto::{
    encryption::{self, EncryptedShare},
    group::{Element, PairingCurve as _},
    poly::Idx,
};
use ethers::{
    types::{Address, H256, U256},
    utils::keccak256,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tx_monitor::{BlockHeader, Ledger, LedgerError, Receipt, TxLookup, TxMonitor, TxOpts};

pub fn block_hash(number: u64) -> H256 {
    H256::from(keccak256(number.to_be_bytes()))
}

fn revert(msg: impl Into<String>) -> ContractError {
    ContractError::Revert(msg.into())
}

fn math_revert(err: DkgError) -> ContractError {
    ContractError::Revert(err.to_string())
}

fn unregistered() -> ParticipantInternalState {
    ParticipantInternalState {
        index: 0,
        nonce: 0,
        phase: Phase::RegistrationOpen,
        public_key: G1::zero(),
        distributed_shares_hash: H256::zero(),
        commitments_first_coefficient: G1::zero(),
        key_share_g1: G1::zero(),
        key_share_g2: G2::zero(),
        gpkj: G2::zero(),
    }
}

struct Chain {
    block: u64,
    nonce: u64,
    phase: Phase,
    phase_start: u64,
    phase_length: u64,
    confirmation_length: u64,
    /// Active validators, evicted ones are removed
    validators: Vec<Address>,
    participants: HashMap<Address, ParticipantInternalState>,
    mpk: G2,
    bad_participants: u64,
    events: Vec<DkgEvent>,
    receipts: HashMap<H256, Receipt>,
    transactions: u64,
    revert_next: bool,
    last_tx_opts: Option<TxOpts>,
}

impl Chain {
    fn emit(&mut self, event: DkgEvent) {
        self.events.push(event);
    }

    fn open_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_start = self.block + self.confirmation_length;
    }

    fn window_over(&self) -> bool {
        self.block >= self.phase_start + self.phase_length
    }

    /// The key share phase has no opening transaction: it starts when the
    /// share dispute window runs out
    fn catch_up(&mut self) {
        if self.phase == Phase::DisputeShareDistribution && self.window_over() {
            self.phase = Phase::KeyShareSubmission;
            self.phase_start += self.phase_length;
        }
    }

    fn ensure_phase(&self, phase: Phase) -> Result<(), ContractError> {
        if self.phase != phase {
            return Err(revert(format!("in {:?}, not {:?}", self.phase, phase)));
        }
        Ok(())
    }

    fn is_validator(&self, account: &Address) -> bool {
        self.validators.contains(account)
    }

    fn ensure_validator(&self, account: &Address) -> Result<(), ContractError> {
        if !self.is_validator(account) {
            return Err(revert(format!("{:?} is not a validator", account)));
        }
        Ok(())
    }

    fn participant(&self, account: &Address) -> Result<&ParticipantInternalState, ContractError> {
        self.participants
            .get(account)
            .filter(|p| p.nonce == self.nonce)
            .ok_or_else(|| revert("participant is not registered"))
    }

    fn participant_mut(
        &mut self,
        account: &Address,
    ) -> Result<&mut ParticipantInternalState, ContractError> {
        let nonce = self.nonce;
        self.participants
            .get_mut(account)
            .filter(|p| p.nonce == nonce)
            .ok_or_else(|| revert("participant is not registered"))
    }

    /// Registered participants of the current run, by index
    fn registered(&self) -> Vec<(Address, &ParticipantInternalState)> {
        let mut list = self
            .participants
            .iter()
            .filter(|(_, p)| p.nonce == self.nonce)
            .map(|(a, p)| (*a, p))
            .collect::<Vec<_>>();
        list.sort_by_key(|(_, p)| p.index);
        list
    }

    /// Whether every active participant satisfies `done`
    fn all_active(&self, done: impl Fn(&ParticipantInternalState) -> bool) -> bool {
        self.registered()
            .into_iter()
            .filter(|(a, _)| self.is_validator(a))
            .all(|(_, p)| done(p))
    }

    fn evict(&mut self, targets: &[Address]) {
        self.validators.retain(|v| !targets.contains(v));
        self.bad_participants += targets.len() as u64;
    }

    /// Rejects the accusation with "already accused" if any target is gone
    fn ensure_accusable(&self, targets: &[Address]) -> Result<(), ContractError> {
        let gone = targets
            .iter()
            .filter(|t| !self.is_validator(t))
            .copied()
            .collect::<Vec<_>>();
        if !gone.is_empty() {
            return Err(ContractError::AlreadyAccused(gone));
        }
        Ok(())
    }

    fn accuse_missing(
        &mut self,
        phase: Phase,
        targets: Vec<Address>,
        missing: impl Fn(Option<&ParticipantInternalState>) -> bool,
    ) -> Result<(), ContractError> {
        self.ensure_phase(phase)?;
        if !self.window_over() {
            return Err(revert("phase is still open"));
        }
        self.ensure_accusable(&targets)?;
        for target in targets.iter() {
            let participant = self.participant(target).ok();
            if !missing(participant) {
                return Err(revert(format!("{:?} did participate", target)));
            }
        }
        self.evict(&targets);
        Ok(())
    }
}

/// Mines every transaction instantly into the current block. Blocks only
/// advance when told to.
pub struct SimulatedChain {
    inner: Mutex<Chain>,
}

impl SimulatedChain {
    pub fn new(validators: Vec<Address>, phase_length: u64, confirmation_length: u64) -> Self {
        Self {
            inner: Mutex::new(Chain {
                block: 0,
                nonce: 0,
                phase: Phase::Completion,
                phase_start: 0,
                phase_length,
                confirmation_length,
                validators,
                participants: HashMap::new(),
                mpk: G2::zero(),
                bad_participants: 0,
                events: Vec::new(),
                receipts: HashMap::new(),
                transactions: 0,
                revert_next: false,
                last_tx_opts: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Chain> {
        let mut chain = self.inner.lock().unwrap();
        chain.catch_up();
        chain
    }

    /// Starts a new run
    pub fn open_registration(&self) {
        let mut chain = self.lock();
        chain.nonce += 1;
        chain.mpk = G2::zero();
        chain.bad_participants = 0;
        chain.open_phase(Phase::RegistrationOpen);
        let event = DkgEvent::RegistrationOpened {
            block: chain.block,
            nonce: chain.nonce,
            phase_length: chain.phase_length,
            confirmation_length: chain.confirmation_length,
        };
        chain.emit(event);
    }

    pub fn block(&self) -> u64 {
        self.inner.lock().unwrap().block
    }

    /// Moves the head forward to `block`, never backwards
    pub fn advance_to(&self, block: u64) {
        let mut chain = self.inner.lock().unwrap();
        chain.block = chain.block.max(block);
    }

    pub fn drain_events(&self) -> Vec<DkgEvent> {
        std::mem::take(&mut self.inner.lock().unwrap().events)
    }

    pub fn bad_participant_count(&self) -> u64 {
        self.inner.lock().unwrap().bad_participants
    }

    pub fn current_phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn mpk(&self) -> G2 {
        self.inner.lock().unwrap().mpk
    }

    /// The next transaction is mined but reverts
    pub fn revert_next(&self) {
        self.inner.lock().unwrap().revert_next = true;
    }

    pub fn last_tx_opts(&self) -> Option<TxOpts> {
        self.inner.lock().unwrap().last_tx_opts
    }

    /// Runs `apply` as a transaction from `opts.from`
    fn submit<F>(&self, opts: &TxOpts, apply: F) -> Result<H256, ContractError>
    where
        F: FnOnce(&mut Chain, Address) -> Result<(), ContractError>,
    {
        let mut chain = self.lock();
        chain.last_tx_opts = Some(*opts);

        let reverted = std::mem::replace(&mut chain.revert_next, false);
        if !reverted {
            apply(&mut *chain, opts.from)?;
        }

        chain.transactions += 1;
        let mut preimage = opts.from.as_bytes().to_vec();
        preimage.extend(chain.transactions.to_be_bytes());
        let hash = H256::from(keccak256(preimage));
        let receipt = Receipt {
            tx_hash: hash,
            block_number: chain.block,
            block_hash: block_hash(chain.block),
            success: !reverted,
            gas_used: U256::from(100_000u64),
        };
        chain.receipts.insert(hash, receipt);
        Ok(hash)
    }
}

#[async_trait]
impl Ledger for SimulatedChain {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.block())
    }

    async fn finalized_block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.block())
    }

    async fn block_header(&self, number: u64) -> Result<Option<BlockHeader>, LedgerError> {
        if number > self.block() {
            return Ok(None);
        }
        Ok(Some(BlockHeader {
            number,
            hash: block_hash(number),
        }))
    }

    async fn transaction(&self, hash: H256) -> Result<TxLookup, LedgerError> {
        Ok(match self.inner.lock().unwrap().receipts.get(&hash) {
            Some(receipt) => TxLookup::Mined(receipt.clone()),
            None => TxLookup::Unknown,
        })
    }

    async fn tx_opts(&self, account: Address) -> Result<TxOpts, LedgerError> {
        Ok(TxOpts {
            from: account,
            max_fee_per_gas: U256::from(100u64),
            max_priority_fee_per_gas: U256::from(2u64),
        })
    }
}

#[async_trait]
impl DkgContract for SimulatedChain {
    async fn phase(&self, _: &tx_monitor::CallOpts) -> Result<Phase, ContractError> {
        Ok(self.lock().phase)
    }

    async fn nonce(&self, _: &tx_monitor::CallOpts) -> Result<u64, ContractError> {
        Ok(self.lock().nonce)
    }

    async fn participant_internal_state(
        &self,
        _: &tx_monitor::CallOpts,
        participant: Address,
    ) -> Result<ParticipantInternalState, ContractError> {
        Ok(self
            .lock()
            .participants
            .get(&participant)
            .cloned()
            .unwrap_or_else(unregistered))
    }

    async fn bad_participants(&self, _: &tx_monitor::CallOpts) -> Result<u64, ContractError> {
        Ok(self.lock().bad_participants)
    }

    async fn is_validator(
        &self,
        _: &tx_monitor::CallOpts,
        account: Address,
    ) -> Result<bool, ContractError> {
        Ok(self.lock().is_validator(&account))
    }

    async fn validators(&self, _: &tx_monitor::CallOpts) -> Result<Vec<Address>, ContractError> {
        Ok(self.lock().validators.clone())
    }

    async fn master_public_key(&self, _: &tx_monitor::CallOpts) -> Result<G2, ContractError> {
        Ok(self.lock().mpk)
    }

    async fn register(&self, opts: &TxOpts, public_key: G1) -> Result<H256, ContractError> {
        self.submit(opts, |chain, sender| {
            chain.ensure_phase(Phase::RegistrationOpen)?;
            chain.ensure_validator(&sender)?;
            if chain.participant(&sender).is_ok() {
                return Err(revert("already registered"));
            }
            if public_key.is_zero() {
                return Err(revert("zero public key"));
            }

            let index = chain.registered().len() as Idx + 1;
            let nonce = chain.nonce;
            chain.participants.insert(
                sender,
                ParticipantInternalState {
                    index,
                    nonce,
                    public_key,
                    ..unregistered()
                },
            );
            chain.emit(DkgEvent::AddressRegistered {
                nonce,
                account: sender,
                index,
                public_key,
            });

            if chain.registered().len() == chain.validators.len() {
                chain.open_phase(Phase::ShareDistribution);
                let block = chain.block;
                chain.emit(DkgEvent::RegistrationComplete { block, nonce });
            }
            Ok(())
        })
    }

    async fn distribute_shares(
        &self,
        opts: &TxOpts,
        encrypted_shares: Vec<EncryptedShare>,
        commitments: Vec<G1>,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, sender| {
            chain.ensure_phase(Phase::ShareDistribution)?;
            chain.ensure_validator(&sender)?;
            let n = chain.registered().len();
            let t = threshold(n as u32) as usize;
            if encrypted_shares.len() + 1 != n || commitments.len() != t + 1 {
                return Err(revert("shares or commitments of the wrong length"));
            }
            if !chain.participant(&sender)?.distributed_shares_hash.is_zero() {
                return Err(revert("shares already distributed"));
            }

            let hash =
                math::distributed_shares_hash(&encrypted_shares, &commitments).map_err(math_revert)?;
            let nonce = chain.nonce;
            let participant = chain.participant_mut(&sender)?;
            participant.distributed_shares_hash = hash;
            participant.commitments_first_coefficient = commitments[0];
            participant.phase = Phase::ShareDistribution;
            chain.emit(DkgEvent::SharesDistributed {
                nonce,
                account: sender,
                encrypted_shares,
                commitments,
            });

            if chain.all_active(|p| !p.distributed_shares_hash.is_zero()) {
                chain.open_phase(Phase::DisputeShareDistribution);
                let block = chain.block;
                chain.emit(DkgEvent::ShareDistributionComplete { block, nonce });
            }
            Ok(())
        })
    }

    async fn submit_key_share(
        &self,
        opts: &TxOpts,
        key_share_g1: G1,
        proof: Proof,
        key_share_g2: G2,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, sender| {
            chain.ensure_phase(Phase::KeyShareSubmission)?;
            chain.ensure_validator(&sender)?;
            let participant = chain.participant(&sender)?;
            if participant.distributed_shares_hash.is_zero() {
                return Err(revert("no shares distributed"));
            }
            let key_share = KeyShare {
                g1: key_share_g1,
                proof: proof.clone(),
                g2: key_share_g2,
            };
            if !math::verify_key_share(&participant.commitments_first_coefficient, &key_share)
                .map_err(math_revert)?
            {
                return Err(revert("invalid key share"));
            }

            let nonce = chain.nonce;
            let participant = chain.participant_mut(&sender)?;
            participant.key_share_g1 = key_share_g1;
            participant.key_share_g2 = key_share_g2;
            participant.phase = Phase::KeyShareSubmission;
            chain.emit(DkgEvent::KeyShareSubmitted {
                nonce,
                account: sender,
                key_share_g1,
                proof,
                key_share_g2,
            });

            if chain.all_active(|p| !p.key_share_g1.is_zero()) {
                chain.open_phase(Phase::MPKSubmission);
                let block = chain.block;
                chain.emit(DkgEvent::KeyShareSubmissionComplete { block, nonce });
            }
            Ok(())
        })
    }

    async fn submit_master_public_key(&self, opts: &TxOpts, mpk: G2) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.ensure_phase(Phase::MPKSubmission)?;
            let g1s = chain
                .registered()
                .into_iter()
                .filter(|(_, p)| !p.key_share_g1.is_zero())
                .map(|(_, p)| p.key_share_g1)
                .collect::<Vec<_>>();
            if !math::verify_master_public_key(&g1s, &mpk).map_err(math_revert)? {
                return Err(revert("master public key does not match the key shares"));
            }

            chain.mpk = mpk;
            chain.open_phase(Phase::GPKJSubmission);
            let (block, nonce) = (chain.block, chain.nonce);
            chain.emit(DkgEvent::MpkSet { block, nonce, mpk });
            Ok(())
        })
    }

    async fn submit_gpkj(&self, opts: &TxOpts, gpkj: G2) -> Result<H256, ContractError> {
        self.submit(opts, |chain, sender| {
            chain.ensure_phase(Phase::GPKJSubmission)?;
            chain.ensure_validator(&sender)?;
            if gpkj.is_zero() {
                return Err(revert("zero gpkj"));
            }
            let nonce = chain.nonce;
            let participant = chain.participant_mut(&sender)?;
            participant.gpkj = gpkj;
            participant.phase = Phase::GPKJSubmission;
            chain.emit(DkgEvent::GpkjSubmitted {
                nonce,
                account: sender,
                gpkj,
            });

            if chain.all_active(|p| !p.gpkj.is_zero()) {
                chain.open_phase(Phase::DisputeGPKJSubmission);
                let block = chain.block;
                chain.emit(DkgEvent::GpkjSubmissionComplete { block, nonce });
            }
            Ok(())
        })
    }

    async fn complete(&self, opts: &TxOpts) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.ensure_phase(Phase::DisputeGPKJSubmission)?;
            if !chain.window_over() {
                return Err(revert("gpkj disputes are still open"));
            }
            chain.phase = Phase::Completion;
            let (block, nonce) = (chain.block, chain.nonce);
            chain.emit(DkgEvent::ValidatorSetCompleted { block, nonce });
            Ok(())
        })
    }

    async fn accuse_participant_not_registered(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.accuse_missing(Phase::RegistrationOpen, dishonest, |p| p.is_none())
        })
    }

    async fn accuse_participant_did_not_distribute_shares(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.accuse_missing(Phase::ShareDistribution, dishonest, |p| {
                p.map_or(false, |p| p.distributed_shares_hash.is_zero())
            })
        })
    }

    async fn accuse_participant_distributed_bad_shares(
        &self,
        opts: &TxOpts,
        evidence: BadSharesEvidence,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, sender| {
            chain.ensure_phase(Phase::DisputeShareDistribution)?;
            if chain.window_over() {
                return Err(revert("share disputes are closed"));
            }
            chain.ensure_accusable(&[evidence.dealer])?;

            let accuser = chain.participant(&sender)?;
            let dealer = chain.participant(&evidence.dealer)?;
            let hash = math::distributed_shares_hash(&evidence.encrypted_shares, &evidence.commitments)
                .map_err(math_revert)?;
            if hash != dealer.distributed_shares_hash {
                return Err(revert("evidence does not match the distributed shares"));
            }
            if !math::verify_dispute_evidence(
                &accuser.public_key,
                &dealer.public_key,
                &evidence.shared_key,
                &evidence.shared_key_proof,
            )
            .map_err(math_revert)?
            {
                return Err(revert("invalid shared key proof"));
            }

            let slot = math::share_slot(dealer.index, accuser.index).map_err(math_revert)?;
            let encrypted = evidence
                .encrypted_shares
                .get(slot)
                .ok_or_else(|| revert("no share for the accuser"))?;
            let bad = match encryption::decrypt_share::<G1Curve>(
                &evidence.shared_key,
                dealer.index,
                accuser.index,
                encrypted,
            ) {
                Ok(share) => !math::share_correct(accuser.index, &share, &evidence.commitments)
                    .map_err(math_revert)?,
                Err(_) => true,
            };
            if !bad {
                return Err(revert("the share is valid"));
            }

            chain.evict(&[evidence.dealer]);
            Ok(())
        })
    }

    async fn accuse_participant_did_not_submit_key_shares(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.accuse_missing(Phase::KeyShareSubmission, dishonest, |p| {
                p.map_or(false, |p| p.key_share_g1.is_zero())
            })
        })
    }

    async fn accuse_participant_did_not_submit_gpkj(
        &self,
        opts: &TxOpts,
        dishonest: Vec<Address>,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.accuse_missing(Phase::GPKJSubmission, dishonest, |p| {
                p.map_or(false, |p| p.gpkj.is_zero())
            })
        })
    }

    async fn accuse_participant_submitted_bad_gpkj(
        &self,
        opts: &TxOpts,
        evidence: BadGpkjEvidence,
    ) -> Result<H256, ContractError> {
        self.submit(opts, |chain, _| {
            chain.ensure_phase(Phase::DisputeGPKJSubmission)?;
            if chain.window_over() {
                return Err(revert("gpkj disputes are closed"));
            }
            chain.ensure_accusable(&[evidence.dishonest])?;

            let dealers = chain
                .registered()
                .into_iter()
                .filter(|(_, p)| !p.key_share_g1.is_zero())
                .collect::<Vec<_>>();
            let addresses = dealers.iter().map(|(a, _)| *a).collect::<Vec<_>>();
            if addresses != evidence.dealers
                || evidence.encrypted_shares_hashes.len() != dealers.len()
                || evidence.commitments.len() != dealers.len()
            {
                return Err(revert("evidence does not cover the qualified dealers"));
            }
            for (i, (_, dealer)) in dealers.iter().enumerate() {
                let hash = math::distributed_shares_hash_from(
                    evidence.encrypted_shares_hashes[i],
                    &evidence.commitments[i],
                )
                .map_err(math_revert)?;
                if hash != dealer.distributed_shares_hash {
                    return Err(revert("commitments do not match the distributed shares"));
                }
            }

            let target = chain.participant(&evidence.dishonest)?;
            let commitments = evidence
                .commitments
                .iter()
                .map(|c| c.as_slice())
                .collect::<Vec<_>>();
            let expected =
                math::expected_gpkj_commitment(&commitments, target.index).map_err(math_revert)?;
            if Bls12::pairing_check(&expected, &math::h2(), &G1::one(), &target.gpkj) {
                return Err(revert("the gpkj is valid"));
            }

            chain.evict(&[evidence.dishonest]);
            Ok(())
        })
    }
}

/// One validator: its context and the tasks scheduled for it so far
pub struct Node {
    pub ctx: TaskContext,
    pub tasks: Vec<DkgTask>,
}

impl Node {
    /// Removes the first scheduled task matching `pick`
    pub fn take(&mut self, pick: fn(&DkgTask) -> bool) -> DkgTask {
        let pos = self
            .tasks
            .iter()
            .position(pick)
            .expect("no such task scheduled");
        self.tasks.remove(pos)
    }
}

pub const PHASE_LENGTH: u64 = 10;
pub const CONFIRMATION_LENGTH: u64 = 2;

pub struct Committee {
    pub chain: Arc<SimulatedChain>,
    pub nodes: Vec<Node>,
}

impl Committee {
    pub fn address(i: usize) -> Address {
        Address::from_low_u64_be(i as u64 + 1)
    }

    pub fn new(n: usize) -> Self {
        Self::with_config(n, DkgConfig::default())
    }

    pub fn with_config(n: usize, config: DkgConfig) -> Self {
        let validators = (0..n).map(Self::address).collect::<Vec<_>>();
        let chain = Arc::new(SimulatedChain::new(
            validators.clone(),
            PHASE_LENGTH,
            CONFIRMATION_LENGTH,
        ));

        let nodes = validators
            .into_iter()
            .map(|account| Node {
                ctx: TaskContext::new(
                    chain.clone(),
                    chain.clone(),
                    DkgStore::in_memory(account),
                    config.clone(),
                ),
                tasks: Vec::new(),
            })
            .collect();

        Self { chain, nodes }
    }

    /// Replays the chain's new events into every validator's state
    pub fn sync(&mut self) -> TaskResult<()> {
        let events = self.chain.drain_events();
        for node in self.nodes.iter_mut() {
            for event in events.iter() {
                let tasks = apply_event(&node.ctx.store, event.clone())?;
                node.tasks.extend(tasks);
            }
        }
        Ok(())
    }

    /// Takes the task matching `pick` from each of `nodes` and moves the
    /// chain to the start of its window
    pub fn take(&mut self, nodes: &[usize], pick: fn(&DkgTask) -> bool) -> Vec<DkgTask> {
        let tasks = nodes
            .iter()
            .map(|i| self.nodes[*i].take(pick))
            .collect::<Vec<_>>();
        for task in tasks.iter() {
            self.chain.advance_to(task.window().start);
        }
        tasks
    }

    /// Runs the task matching `pick` on each of `nodes`, then syncs
    pub async fn run(
        &mut self,
        nodes: &[usize],
        pick: fn(&DkgTask) -> bool,
        monitor: Option<&TxMonitor>,
    ) -> Vec<TaskResult<Vec<Receipt>>> {
        let tasks = self.take(nodes, pick);
        let mut results = Vec::with_capacity(tasks.len());
        for (i, task) in nodes.iter().zip(tasks.iter()) {
            results.push(run_task(&self.nodes[*i].ctx, task, monitor).await);
        }
        self.sync().expect("events apply");
        results
    }

    pub fn all(&self) -> Vec<usize> {
        (0..self.nodes.len()).collect()
    }
}
