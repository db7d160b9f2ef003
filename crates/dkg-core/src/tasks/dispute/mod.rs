//! Accusations against participants who skipped a phase or published data
//! which fails verification.
//!
//! `prepare` computes the targets from the local state and persists them,
//! `should_execute` drops the targets someone else already got evicted, and
//! `execute` accuses the rest. When another validator wins the race the
//! contract answers with "already accused". The evicted targets are dropped
//! and the others accused again; only when nobody is left does it surface as
//! the recoverable `TaskError::AlreadyAccused`.
mod missing;
pub use missing::DisputeMissingTask;

mod bad_shares;
pub use bad_shares::DisputeBadSharesTask;

mod bad_gpkj;
pub use bad_gpkj::DisputeGpkjTask;
