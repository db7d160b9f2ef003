use super::{ensure_phase, load_state, mpk::ensure_leader, BlockWindow, Task};
use crate::{
    context::TaskContext,
    errors::{DkgError, TaskError, TaskResult},
    math,
    state::Phase,
};
use async_trait::async_trait;
use ethers::types::H256;
use tracing::info;

/// Closes the run once the gpkj dispute window is over. Only the elected
/// leader submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTask {
    window: BlockWindow,
}

impl CompletionTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl Task for CompletionTask {
    fn name(&self) -> &'static str {
        "completion"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            state.on_completion_opened();
            ensure_phase(state, Phase::Completion)?;

            let mpk = state
                .master_public_key
                .ok_or(DkgError::Missing("master public key"))?;
            let participants = state.participants_by_index()?;
            let dealers = state.qualified_dealers()?;
            let signers = math::categorize_group_signers(&participants, &dealers, state.nonce)?;

            // any threshold + 1 honest GPKj values must interpolate to the MPK
            let needed = state.validator_threshold as usize + 1;
            if signers.honest.len() < needed {
                return Err(TaskError::State(format!(
                    "{} honest gpkj values, {} needed",
                    signers.honest.len(),
                    needed
                )));
            }
            let gpkjs = signers
                .honest
                .iter()
                .take(needed)
                .map(|p| (p.index, p.gpkj))
                .collect::<Vec<_>>();
            let recovered = math::recover_master_public_key(
                &gpkjs,
                state.validator_threshold,
                state.number_of_validators,
            )?;
            if recovered != mpk {
                return Err(TaskError::State(
                    "gpkj values do not interpolate to the master public key".into(),
                ));
            }
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        if load_state(ctx)?.completed {
            return Ok(false);
        }
        let opts = ctx.call_opts().await?;
        let phase = ctx.call("phase", ctx.contract.phase(&opts)).await?;
        Ok(phase != Phase::Completion)
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let state = load_state(ctx)?;
        ensure_leader(ctx, &state).await?;

        let opts = ctx.tx_opts().await?;
        let hash = ctx.send("complete", ctx.contract.complete(&opts)).await?;
        info!(account = ?ctx.account, tx = ?hash, "completed the run");
        Ok(vec![hash])
    }
}
