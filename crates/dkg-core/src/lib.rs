//! # DKG Core
//!
//! The validator-side logic of an on-chain distributed key generation. A
//! committee of validators jointly generates a BLS12-381 key pair whose secret
//! is never known to anyone: every validator deals a secret polynomial, proves
//! the consistency of its shares on chain, and ends up with a share of the
//! group secret that can be used for threshold signatures.
//!
//! The contract drives the run through its [`Phase`]s and emits a [`DkgEvent`]
//! at every step. [`process_event`] folds those events into the persisted
//! [`DkgState`] and returns the [`DkgTask`]s which follow from them, each with
//! the block window it is meant to run in. [`run_task`] then takes a task
//! through prepare, should-execute and execute, optionally waiting for the
//! submitted transactions to be confirmed.
//!
//! The chain itself is abstracted behind [`DkgContract`] and the
//! [`tx_monitor::Ledger`] trait, so the whole protocol can be exercised
//! against an in-memory chain.

/// Timeouts and leader election knobs
mod config;
pub use config::DkgConfig;

/// Shared handles and helpers of every task invocation
mod context;
pub use context::TaskContext;

/// The on-chain contract surface
mod contract;
pub use contract::{
    BadGpkjEvidence, BadSharesEvidence, ContractError, DkgContract, ParticipantInternalState,
};

mod errors;
pub use errors::{DkgError, DkgResult, StoreError, TaskError, TaskResult};

/// Contract events and the state transitions they cause
mod events;
pub use events::{apply_event, process_event, DkgEvent};

/// Leader election for collective submissions
pub mod leader;

/// Protocol-level cryptography
pub mod math;

mod runner;
pub use runner::run_task;

/// Phases, participants and the validator's local view of a run
mod state;
pub use state::{threshold, AccusationKind, DkgState, Participant, Phase};

/// Persistence of the local state
mod store;
pub use store::DkgStore;

/// One task per protocol action
pub mod tasks;
pub use tasks::{BlockWindow, DkgTask, Task};

#[cfg(test)]
mod test_helpers;
