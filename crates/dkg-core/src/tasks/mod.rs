//! # Tasks
//!
//! One task per protocol action. Every task goes through the same lifecycle:
//!
//! 1. `prepare` does the local computation for the phase (keys, shares,
//!    proofs, accusation targets) and persists it. It is idempotent: whatever
//!    was already computed for the current run is kept.
//! 2. `should_execute` asks the contract whether the action is still needed,
//!    so that a retried task does not submit twice.
//! 3. `execute` submits the transaction(s) and returns their hashes.
//!
//! Tasks hold nothing but their block window; all state lives in the store.
use crate::{
    context::TaskContext,
    errors::{TaskError, TaskResult},
    state::{AccusationKind, DkgState, Phase},
};
use async_trait::async_trait;
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod register;
pub use register::RegisterTask;

mod share_distribution;
pub use share_distribution::ShareDistributionTask;

mod key_share;
pub use key_share::KeyShareSubmissionTask;

mod mpk;
pub use mpk::MpkSubmissionTask;

mod gpkj;
pub use gpkj::GpkjSubmissionTask;

mod completion;
pub use completion::CompletionTask;

mod dispute;
pub use dispute::{DisputeBadSharesTask, DisputeGpkjTask, DisputeMissingTask};

/// The `[start, end)` block heights within which a task is meant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub start: u64,
    pub end: u64,
}

impl BlockWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, block: u64) -> bool {
        self.start <= block && block < self.end
    }
}

#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    fn window(&self) -> BlockWindow;

    async fn prepare(&self, ctx: &TaskContext) -> TaskResult<()>;

    async fn should_execute(&self, ctx: &TaskContext) -> TaskResult<bool>;

    /// Returns the hashes of the submitted transactions
    async fn execute(&self, ctx: &TaskContext) -> TaskResult<Vec<H256>>;
}

/// Every task the event processor can schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DkgTask {
    Register(RegisterTask),
    ShareDistribution(ShareDistributionTask),
    KeyShareSubmission(KeyShareSubmissionTask),
    MpkSubmission(MpkSubmissionTask),
    GpkjSubmission(GpkjSubmissionTask),
    Completion(CompletionTask),
    DisputeMissing(DisputeMissingTask),
    DisputeShareDistribution(DisputeBadSharesTask),
    DisputeGpkj(DisputeGpkjTask),
}

impl DkgTask {
    pub fn as_task(&self) -> &dyn Task {
        match self {
            DkgTask::Register(task) => task,
            DkgTask::ShareDistribution(task) => task,
            DkgTask::KeyShareSubmission(task) => task,
            DkgTask::MpkSubmission(task) => task,
            DkgTask::GpkjSubmission(task) => task,
            DkgTask::Completion(task) => task,
            DkgTask::DisputeMissing(task) => task,
            DkgTask::DisputeShareDistribution(task) => task,
            DkgTask::DisputeGpkj(task) => task,
        }
    }

    pub fn name(&self) -> &'static str {
        self.as_task().name()
    }

    pub fn window(&self) -> BlockWindow {
        self.as_task().window()
    }
}

/// Reads the state, turning store errors into task errors
pub(crate) fn load_state(ctx: &TaskContext) -> TaskResult<DkgState> {
    Ok(ctx.store.load()?)
}

/// Fails unless the state's phase is `expected`
pub(crate) fn ensure_phase(state: &DkgState, expected: Phase) -> TaskResult<()> {
    Ok(state.ensure_phase(expected)?)
}

/// Drops the targets the contract already evicted and persists what is left.
/// Returns whether anyone is left to accuse.
pub(crate) async fn retain_active(ctx: &TaskContext, kind: AccusationKind) -> TaskResult<bool> {
    let targets = accusation_targets(ctx, kind)?;
    if targets.is_empty() {
        return Ok(false);
    }

    let opts = ctx.call_opts().await?;
    let mut active = Vec::with_capacity(targets.len());
    for target in targets {
        if ctx
            .call("validator status", ctx.contract.is_validator(&opts, target))
            .await?
        {
            active.push(target);
        } else {
            debug!(?kind, ?target, "skipping participant which was already evicted");
        }
    }

    let remaining = !active.is_empty();
    ctx.store.update(|state| -> TaskResult<()> {
        state.accusations.insert(kind, active);
        Ok(())
    })?;
    Ok(remaining)
}

/// The targets persisted by `prepare` for `kind`
pub(crate) fn accusation_targets(ctx: &TaskContext, kind: AccusationKind) -> TaskResult<Vec<Address>> {
    ctx.store.view(|state| -> TaskResult<Vec<Address>> {
        Ok(state.accusations.get(&kind).cloned().unwrap_or_default())
    })
}

/// Persists the targets still to be accused
pub(crate) fn store_targets(
    ctx: &TaskContext,
    kind: AccusationKind,
    targets: Vec<Address>,
) -> TaskResult<()> {
    ctx.store.update(|state| -> TaskResult<()> {
        state.accusations.insert(kind, targets);
        Ok(())
    })
}

/// Maps "nothing left to accuse" after a race into the recoverable error
pub(crate) fn raced(submitted: Vec<H256>, already: Vec<Address>) -> TaskResult<Vec<H256>> {
    if submitted.is_empty() && !already.is_empty() {
        return Err(TaskError::AlreadyAccused(already));
    }
    Ok(submitted)
}
