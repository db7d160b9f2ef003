use anyhow::{Context, Result};
use dkg_core::DkgConfig;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::PathBuf};
use tx_monitor::MonitorConfig;

/// Everything a validator node needs besides its signing key. Missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// The validator's on-chain account
    pub account: Address,
    /// Directory of the LMDB state store
    pub state_path: PathBuf,
    /// Keypair file written by `keygen`. Registered in every run instead of a
    /// freshly generated transport key.
    pub transport_key: Option<PathBuf>,
    pub dkg: DkgConfig,
    pub monitor: MonitorConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            account: Address::zero(),
            state_path: PathBuf::from("dkg-state"),
            transport_key: None,
            dkg: DkgConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening config {}", path))?;
        serde_json::from_reader(file).with_context(|| format!("parsing config {}", path))
    }
}
