use super::{ensure_phase, load_state, BlockWindow, Task};
use crate::{
    context::TaskContext,
    errors::{DkgError, TaskResult},
    math,
    state::Phase,
};
use async_trait::async_trait;
use ethers::types::H256;
use tracing::info;

/// Derives our share of the group key from the qualified dealers' shares and
/// publishes the matching GPKj
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpkjSubmissionTask {
    window: BlockWindow,
}

impl GpkjSubmissionTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl Task for GpkjSubmissionTask {
    fn name(&self) -> &'static str {
        "gpkj submission"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::GPKJSubmission)?;
            if state.group_private_key.is_some() {
                return Ok(());
            }

            let private_key = state
                .transport_private_key
                .ok_or(DkgError::Missing("transport private key"))?;
            let (group_private_key, group_public_key) = {
                let coefficients = state
                    .private_coefficients
                    .as_ref()
                    .ok_or(DkgError::Missing("private coefficients"))?;
                let dealers = state.qualified_dealers()?;
                math::generate_group_keys(&private_key, state.index, coefficients, &dealers)?
            };

            state.group_private_key = Some(group_private_key);
            state.group_public_key = Some(group_public_key);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        let state = load_state(ctx)?;
        let gpkj = match state.group_public_key {
            Some(gpkj) => gpkj,
            None => return Ok(true),
        };

        let opts = ctx.call_opts().await?;
        let onchain = ctx
            .call(
                "participant state",
                ctx.contract.participant_internal_state(&opts, ctx.account),
            )
            .await?;

        Ok(!(onchain.nonce == state.nonce && onchain.gpkj == gpkj))
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let gpkj = load_state(ctx)?
            .group_public_key
            .ok_or(DkgError::Missing("group public key"))?;

        let opts = ctx.tx_opts().await?;
        let hash = ctx
            .send("submit gpkj", ctx.contract.submit_gpkj(&opts, gpkj))
            .await?;
        info!(account = ?ctx.account, tx = ?hash, "submitted gpkj");
        Ok(vec![hash])
    }
}
