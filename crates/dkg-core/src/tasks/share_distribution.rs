use super::{ensure_phase, load_state, BlockWindow, Task};
use crate::{
    context::TaskContext,
    errors::{DkgError, TaskResult},
    math,
    state::Phase,
};
use async_trait::async_trait;
use ethers::types::H256;
use rand::thread_rng;
use tracing::{debug, info};

/// Deals a secret polynomial to the registered participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareDistributionTask {
    window: BlockWindow,
}

impl ShareDistributionTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl Task for ShareDistributionTask {
    fn name(&self) -> &'static str {
        "share distribution"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::ShareDistribution)?;
            if state.private_coefficients.is_some() {
                return Ok(());
            }

            let private_key = state
                .transport_private_key
                .ok_or(DkgError::Missing("transport private key"))?;
            let dealt = {
                let participants = state.participants_by_index()?;
                math::generate_shares(
                    &mut thread_rng(),
                    &private_key,
                    state.index,
                    &participants,
                    state.validator_threshold,
                )?
            };

            let secret = *dealt.coefficients.free_coefficient().map_err(DkgError::from)?;
            debug!(
                index = state.index,
                shares = dealt.encrypted_shares.len(),
                commitments = dealt.commitments.len(),
                "dealt shares"
            );
            state.secret_value = Some(secret);
            state.private_coefficients = Some(dealt.coefficients);
            state.commitments = dealt.commitments;
            state.encrypted_shares = dealt.encrypted_shares;
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        let state = load_state(ctx)?;
        let expected = math::distributed_shares_hash(&state.encrypted_shares, &state.commitments)?;

        let opts = ctx.call_opts().await?;
        let onchain = ctx
            .call(
                "participant state",
                ctx.contract.participant_internal_state(&opts, ctx.account),
            )
            .await?;

        Ok(!(onchain.nonce == state.nonce && onchain.distributed_shares_hash == expected))
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let state = load_state(ctx)?;
        if state.commitments.is_empty() {
            return Err(DkgError::Missing("commitments").into());
        }

        let opts = ctx.tx_opts().await?;
        let hash = ctx
            .send(
                "distribute shares",
                ctx.contract
                    .distribute_shares(&opts, state.encrypted_shares, state.commitments),
            )
            .await?;
        info!(account = ?ctx.account, tx = ?hash, "distributed shares");
        Ok(vec![hash])
    }
}
