//! # Transaction Monitor
//!
//! The interface this node uses to talk to the layer-1 ledger, plus an engine
//! which tracks submitted transactions until they are confirmed, go stale or
//! are dropped from the mempool.
//!
//! The [`Ledger`] trait is what the rest of the node consumes; [`EthersLedger`]
//! implements it for any `ethers` middleware stack. [`TxMonitor`] polls a ledger
//! on a fixed interval with a bounded pool of workers and hands every caller
//! exactly one outcome for each transaction it asked to track.

mod config;
pub use config::MonitorConfig;

mod errors;
pub use errors::{LedgerError, ReceiptError};

mod ledger;
pub use ledger::{BlockHeader, CallOpts, Ledger, Receipt, TxLookup, TxOpts};

mod provider;
pub use provider::EthersLedger;

mod monitor;
pub use monitor::{ReceiptHandle, TxMonitor};

/// Re-exported so that downstream crates agree on hash and address types
pub use ethers::types::{Address, H256, U256};
