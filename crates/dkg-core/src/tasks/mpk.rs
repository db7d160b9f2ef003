use super::{ensure_phase, load_state, BlockWindow, Task};
use crate::{
    context::TaskContext,
    errors::{DkgError, TaskError, TaskResult},
    leader,
    math,
    state::{DkgState, Phase},
};
use async_trait::async_trait;
use dkg_crypto::group::Element;
use ethers::types::H256;
use tracing::{debug, info};

/// Sums the qualified key shares into the master public key. Only the elected
/// leader submits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpkSubmissionTask {
    window: BlockWindow,
}

impl MpkSubmissionTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

/// Fails with `NotLeading` unless the local validator may submit the phase's
/// collective transaction at the current block
pub(crate) async fn ensure_leader(ctx: &TaskContext, state: &DkgState) -> TaskResult<()> {
    let current = ctx.current_block().await?;
    let seed = ctx.block_hash(state.phase_start).await?;
    let leading = leader::is_leader(
        seed,
        state.phase_start,
        current,
        state.number_of_validators,
        state.index,
        &ctx.config,
    );
    debug!(index = state.index, current, leading, "leader election");

    if !leading {
        return Err(TaskError::NotLeading);
    }
    Ok(())
}

#[async_trait]
impl Task for MpkSubmissionTask {
    fn name(&self) -> &'static str {
        "master public key submission"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::MPKSubmission)?;
            if state.master_public_key.is_some() {
                return Ok(());
            }

            let dealers = state.qualified_dealers()?;
            let g1s = dealers.iter().map(|d| d.key_share_g1).collect::<Vec<_>>();
            let g2s = dealers.iter().map(|d| d.key_share_g2).collect::<Vec<_>>();

            let mpk = math::generate_master_public_key(&g2s)?;
            if !math::verify_master_public_key(&g1s, &mpk)? {
                return Err(TaskError::State(
                    "master public key does not match the G1 key shares".into(),
                ));
            }
            debug!(dealers = dealers.len(), "computed master public key");

            state.master_public_key = Some(mpk);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        let opts = ctx.call_opts().await?;
        let onchain = ctx
            .call("master public key", ctx.contract.master_public_key(&opts))
            .await?;
        Ok(onchain.is_zero())
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let state = load_state(ctx)?;
        let mpk = state
            .master_public_key
            .ok_or(DkgError::Missing("master public key"))?;
        ensure_leader(ctx, &state).await?;

        let opts = ctx.tx_opts().await?;
        let hash = ctx
            .send(
                "submit master public key",
                ctx.contract.submit_master_public_key(&opts, mpk),
            )
            .await?;
        info!(account = ?ctx.account, tx = ?hash, "submitted master public key");
        Ok(vec![hash])
    }
}
