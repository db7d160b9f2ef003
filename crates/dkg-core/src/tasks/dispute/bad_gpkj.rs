use crate::{
    context::TaskContext,
    contract::BadGpkjEvidence,
    errors::{TaskError, TaskResult},
    math,
    state::{AccusationKind, DkgState, Phase},
    tasks::{accusation_targets, ensure_phase, load_state, raced, retain_active, BlockWindow, Task},
};
use async_trait::async_trait;
use ethers::types::{Address, H256};
use tracing::{debug, info, warn};

const KIND: AccusationKind = AccusationKind::SubmittedBadGpkj;

/// Accuses participants whose GPKj does not match the dealers' commitments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeGpkjTask {
    window: BlockWindow,
}

impl DisputeGpkjTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

/// The qualified dealers' commitments, with hashes standing in for their
/// ciphertexts, are enough for the contract to recompute any GPKj
fn evidence_against(state: &DkgState, targets: &[Address]) -> TaskResult<Vec<BadGpkjEvidence>> {
    let dealers = state.qualified_dealers()?;
    let encrypted_shares_hashes = dealers
        .iter()
        .map(|d| math::encrypted_shares_hash(&d.encrypted_shares))
        .collect::<Result<Vec<_>, _>>()?;
    let commitments = dealers
        .iter()
        .map(|d| d.commitments.clone())
        .collect::<Vec<_>>();
    let addresses = dealers.iter().map(|d| d.address).collect::<Vec<_>>();

    Ok(targets
        .iter()
        .map(|target| BadGpkjEvidence {
            dealers: addresses.clone(),
            encrypted_shares_hashes: encrypted_shares_hashes.clone(),
            commitments: commitments.clone(),
            dishonest: *target,
        })
        .collect())
}

#[async_trait]
impl Task for DisputeGpkjTask {
    fn name(&self) -> &'static str {
        "dispute gpkj"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::DisputeGPKJSubmission)?;

            let targets = {
                let participants = state.participants_by_index()?;
                let dealers = state.qualified_dealers()?;
                let signers = math::categorize_group_signers(&participants, &dealers, state.nonce)?;
                debug!(
                    honest = signers.honest.len(),
                    dishonest = signers.dishonest.len(),
                    missing = signers.missing.len(),
                    "categorized group signers"
                );
                signers
                    .dishonest
                    .iter()
                    .filter(|p| p.address != state.account)
                    .map(|p| {
                        warn!(
                            participant = ?p.address,
                            index = p.index,
                            "gpkj does not match the commitments"
                        );
                        p.address
                    })
                    .collect::<Vec<_>>()
            };

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
            let dishonest = evidence.dishonest;
            let accusation = ctx
                .contract
                .accuse_participant_submitted_bad_gpkj(&opts, evidence);
            match ctx.send(self.name(), accusation).await {
                Ok(hash) => {
                    info!(?dishonest, tx = ?hash, "accused participant of a bad gpkj");
                    submitted.push(hash);
                }
                Err(TaskError::AlreadyAccused(_)) => {
                    debug!(?dishonest, "participant was already accused");
                    already.push(dishonest);
                }
                Err(err) => return Err(err),
            }
        }

        raced(submitted, already)
    }
}
