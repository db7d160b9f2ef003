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

/// Registers the transport key for the current run: the operator's, if the
/// context carries one, otherwise a fresh one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTask {
    window: BlockWindow,
}

impl RegisterTask {
    pub fn new(window: BlockWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl Task for RegisterTask {
    fn name(&self) -> &'static str {
        "register"
    }

    fn window(&self) -> BlockWindow {
        self.window
    }

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.store.update(|state| -> TaskResult<()> {
            ensure_phase(state, Phase::RegistrationOpen)?;
            if state.transport_private_key.is_some() {
                return Ok(());
            }

            let (private, public) = match ctx.transport_key {
                Some(private) => math::transport_keys_from(private)?,
                None => math::generate_transport_keys(&mut thread_rng()),
            };
            state.transport_private_key = Some(private);
            state.transport_public_key = Some(public);
            Ok(())
        })
    }

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool> {
        let state = load_state(ctx)?;
        let opts = ctx.call_opts().await?;
        let onchain = ctx
            .call(
                "participant state",
                ctx.contract.participant_internal_state(&opts, ctx.account),
            )
            .await?;

        let registered =
            onchain.nonce == state.nonce && Some(onchain.public_key) == state.transport_public_key;
        Ok(!registered)
    }

    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>> {
        let public_key = load_state(ctx)?
            .transport_public_key
            .ok_or(DkgError::Missing("transport public key"))?;

        let opts = ctx.tx_opts().await?;
        let hash = ctx
            .send("register", ctx.contract.register(&opts, public_key))
            .await?;
        info!(account = ?ctx.account, tx = ?hash, "registered transport key");
        Ok(vec![hash])
    }
}
