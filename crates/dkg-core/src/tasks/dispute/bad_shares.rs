use crate::{
    context::TaskContext,
    contract::BadSharesEvidence,
    errors::{DkgError, TaskError, TaskResult},
    math,
    state::{AccusationKind, DkgState, Phase},
    tasks::{accusation_targets, ensure_phase, load_state, raced, retain_active, BlockWindow, Task},
};
use async_trait::async_trait;
use ethers::types::{Address, H256};
use rand::thread_rng;
use tracing::{debug, info, warn};

const KIND: AccusationKind = AccusationKind::DistributedBadShares;

/// Accuses dealers whose share for us does not match their commitments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeBadSharesTask {
    window: BlockWindow,
}

impl DisputeBadSharesTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

/// Opens our pairwise key with every target so that the contract can decrypt
/// the disputed share itself
fn evidence_against(state: &DkgState, targets: &[Address]) -> TaskResult<Vec<BadSharesEvidence>> {
    let private_key = state
        .transport_private_key
        .ok_or(DkgError::Missing("transport private key"))?;
    let rng = &mut thread_rng();

    targets
        .iter()
        .map(|target| -> TaskResult<BadSharesEvidence> {
            let dealer = state.participant(target)?;
            let (shared_key, shared_key_proof) =
                math::dispute_evidence(rng, &private_key, &dealer.public_key)?;
            Ok(BadSharesEvidence {
                dealer: dealer.address,
                encrypted_shares: dealer.encrypted_shares.clone(),
                commitments: dealer.commitments.clone(),
                shared_key,
                shared_key_proof,
            })
        })
        .collect()
}

#[async_trait]
impl Task for DisputeBadSharesTask {
    fn name(&self) -> &'static str {
        "dispute share distribution"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::DisputeShareDistribution)?;
            let private_key = state
                .transport_private_key
                .ok_or(DkgError::Missing("transport private key"))?;

            let mut targets = Vec::new();
            for dealer in state.participants_by_index()? {
                let (valid, present) = math::verify_distributed_shares(
                    &private_key,
                    state.index,
                    dealer,
                    state.number_of_validators,
                    state.validator_threshold,
                )?;
                if present && !valid {
                    warn!(dealer = ?dealer.address, index = dealer.index, "received a bad share");
                    targets.push(dealer.address);
                }
            }

            debug!(targets = targets.len(), "verified distributed shares");
            state.accusations.insert(KIND, targets);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        retain_active(ctx, KIND).await
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let targets = accusation_targets(ctx, KIND)?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let evidence = evidence_against(&load_state(ctx)?, &targets)?;

        let opts = ctx.tx_opts().await?;
        let mut submitted = Vec::new();
        let mut already = Vec::new();
        for evidence in evidence {
            let dealer = evidence.dealer;
            let accusation = ctx
                .contract
                .accuse_participant_distributed_bad_shares(&opts, evidence);
            match ctx.send(self.name(), accusation).await {
                Ok(hash) => {
                    info!(?dealer, tx = ?hash, "accused dealer of bad shares");
                    submitted.push(hash);
                }
                Err(TaskError::AlreadyAccused(_)) => {
                    debug!(?dealer, "dealer was already accused");
                    already.push(dealer);
                }
                Err(err) => return Err(err),
            }
        }

        raced(submitted, already)
    }
}
