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
use tracing::info;

/// Publishes the secret value on both key share bases, together with a proof
/// tying it to the first commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareSubmissionTask {
    window: BlockWindow,
}

impl KeyShareSubmissionTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl Task for KeyShareSubmissionTask {
    fn name(&self) -> &'static str {
        "key share submission"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            // no event announces this phase, the dispute window just runs out
            state.on_key_share_submission_opened();
            ensure_phase(state, Phase::KeyShareSubmission)?;
            if state.key_share.is_some() {
                return Ok(());
            }

            let secret = state
                .secret_value
                .ok_or(DkgError::Missing("secret value"))?;
            let first_commitment = *state
                .commitments
                .first()
                .ok_or(DkgError::Missing("commitments"))?;

            let key_share = math::generate_key_share(&mut thread_rng(), &secret, &first_commitment)?;
            state.key_share = Some(key_share);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        let state = load_state(ctx)?;
        let key_share = match state.key_share {
            Some(key_share) => key_share,
            None => return Ok(true),
        };

        let opts = ctx.call_opts().await?;
        let onchain = ctx
            .call(
                "participant state",
                ctx.contract.participant_internal_state(&opts, ctx.account),
            )
            .await?;

        Ok(!(onchain.nonce == state.nonce && onchain.key_share_g1 == key_share.g1))
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let key_share = load_state(ctx)?
            .key_share
            .ok_or(DkgError::Missing("key share"))?;

        let opts = ctx.tx_opts().await?;
        let hash = ctx
            .send(
                "submit key share",
                ctx.contract
                    .submit_key_share(&opts, key_share.g1, key_share.proof, key_share.g2),
            )
            .await?;
        info!(account = ?ctx.account, tx = ?hash, "submitted key share");
        Ok(vec![hash])
    }
}
