use crate::{
    context::TaskContext,
    contract::{ContractError, DkgContract},
    errors::{TaskError, TaskResult},
    state::{AccusationKind, Phase},
    tasks::{
        accusation_targets, ensure_phase, load_state, raced, retain_active, store_targets,
        BlockWindow, Task,
    },
};
use async_trait::async_trait;
use dkg_crypto::group::Element;
use ethers::types::{Address, H256};
use futures::future::BoxFuture;
use tracing::{debug, info};
use tx_monitor::TxOpts;

fn unsupported(kind: AccusationKind) -> TaskError {
    TaskError::State(format!("{:?} is not about missing data", kind))
}

/// Accuses the participants who did not act during a phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeMissingTask {
    kind: AccusationKind,
    window: BlockWindow,
}

impl DisputeMissingTask {
    pub fn new(kind: AccusationKind, window: BlockWindow) -> Self {
        Self { kind, window }
    }

    pub fn kind(&self) -> AccusationKind {
        self.kind
    }

    /// The phase whose participation is checked
    fn phase(&self) -> TaskResult<Phase> {
        match self.kind {
            AccusationKind::NotRegistered => Ok(Phase::RegistrationOpen),
            AccusationKind::DidNotDistributeShares => Ok(Phase::ShareDistribution),
            AccusationKind::DidNotSubmitKeyShare => Ok(Phase::KeyShareSubmission),
            AccusationKind::DidNotSubmitGpkj => Ok(Phase::GPKJSubmission),
            kind => Err(unsupported(kind)),
        }
    }

    fn accuse<'a>(
        &self,
        contract: &'a dyn DkgContract,
        opts: &'a TxOpts,
        targets: Vec<Address>,
    ) -> TaskResult<BoxFuture<'a, Result<H256, ContractError>>> {
        Ok(match self.kind {
            AccusationKind::NotRegistered => contract.accuse_participant_not_registered(opts, targets),
            AccusationKind::DidNotDistributeShares => {
                contract.accuse_participant_did_not_distribute_shares(opts, targets)
            }
            AccusationKind::DidNotSubmitKeyShare => {
                contract.accuse_participant_did_not_submit_key_shares(opts, targets)
            }
            AccusationKind::DidNotSubmitGpkj => {
                contract.accuse_participant_did_not_submit_gpkj(opts, targets)
            }
            kind => return Err(unsupported(kind)),
        })
    }
}

#[async_trait]
impl Task for DisputeMissingTask {
    fn name(&self) -> &'static str {
        match self.kind {
            AccusationKind::NotRegistered => "dispute missing registration",
            AccusationKind::DidNotDistributeShares => "dispute missing shares",
            AccusationKind::DidNotSubmitKeyShare => "dispute missing key shares",
            AccusationKind::DidNotSubmitGpkj => "dispute missing gpkj",
            _ => "dispute missing",
        }
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        let kind = self.kind;
        let phase = self.phase()?;

        // who should have registered is only known to the contract
        let validators = if kind == AccusationKind::NotRegistered
            && load_state(ctx)?.phase == phase
        {
            let opts = ctx.call_opts().await?;
            ctx.call("validators", ctx.contract.validators(&opts))
                .await?
        } else {
            Vec::new()
        };

        ctx.store.update(|state| -> TaskResult<()> {
            if kind == AccusationKind::DidNotSubmitKeyShare {
                state.on_key_share_submission_opened();
            }
            // the phase only completes once every active validator acted
            if state.phase > phase {
                debug!(?kind, current = ?state.phase, "phase completed, nobody is missing");
                state.accusations.insert(kind, Vec::new());
                return Ok(());
            }
            ensure_phase(state, phase)?;

            let nonce = state.nonce;
            let account = state.account;
            let targets: Vec<Address> = if kind == AccusationKind::NotRegistered {
                validators
                    .into_iter()
                    .filter(|v| !state.participants.contains_key(v))
                    .collect()
            } else {
                state
                    .participants_by_index()?
                    .into_iter()
                    .filter(|p| {
                        let published = match kind {
                            AccusationKind::DidNotDistributeShares => !p.commitments.is_empty(),
                            AccusationKind::DidNotSubmitKeyShare => !p.key_share_g1.is_zero(),
                            _ => !p.gpkj.is_zero(),
                        };
                        !(p.acted_in(nonce, phase) && published)
                    })
                    .map(|p| p.address)
                    .collect()
            };
            let targets = targets
                .into_iter()
                .filter(|t| *t != account)
                .collect::<Vec<_>>();

            debug!(?kind, targets = targets.len(), "found missing participants");
            state.accusations.insert(kind, targets);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        retain_active(ctx, self.kind).await
    }

    /// Accuses every target in one transaction. Targets which someone else
    /// evicted in the meantime are dropped and the rest is accused again.
    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let mut targets = accusation_targets(ctx, self.kind)?;
        let mut already = Vec::new();

        while !targets.is_empty() {
            let opts = ctx.tx_opts().await?;
            let accusation = self.accuse(ctx.contract.as_ref(), &opts, targets.clone())?;
            match ctx.send(self.name(), accusation).await {
                Ok(hash) => {
                    info!(kind = ?self.kind, ?targets, tx = ?hash, "accused missing participants");
                    return Ok(vec![hash]);
                }
                Err(TaskError::AlreadyAccused(gone)) => {
                    let before = targets.len();
                    targets.retain(|t| !gone.contains(t));
                    if targets.len() == before {
                        return Err(TaskError::AlreadyAccused(gone));
                    }
                    debug!(
                        kind = ?self.kind,
                        ?gone,
                        remaining = targets.len(),
                        "some targets were already evicted"
                    );
                    already.extend(gone);
                    store_targets(ctx, self.kind, targets.clone())?;
                }
                Err(err) => return Err(err),
            }
        }

        raced(Vec::new(), already)
    }
}
