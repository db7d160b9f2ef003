use crate::{
    config::NodeConfig,
    opts::{ConfigOpts, InspectOpts, KeygenOpts},
};
use anyhow::{ensure, Context, Result};
use dkg_core::{
    math::{self, Scalar, G1},
    AccusationKind, DkgState, DkgStore, Phase,
};
use ethers::types::Address;
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::BTreeMap, fs::File, path::Path};
use tracing::info;

#[derive(Serialize, Deserialize, Debug)]
struct TransportKeypairJson {
    #[serde(rename = "publicKey")]
    public_key: String,
    #[serde(rename = "privateKey")]
    private_key: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct StateSummary {
    account: Address,
    nonce: u64,
    phase: Phase,
    phase_start: u64,
    phase_end: u64,
    index: u32,
    validators: u32,
    threshold: u32,
    registered: usize,
    qualified_dealers: usize,
    accusations: BTreeMap<AccusationKind, Vec<Address>>,
    master_public_key: Option<String>,
    group_public_key: Option<String>,
    /// Whether the configured transport key is the one in the state
    transport_key_matches: Option<bool>,
    completed: bool,
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(hex::encode(bincode::serialize(value)?))
}

fn decode<T: DeserializeOwned>(value: &str) -> Result<T> {
    Ok(bincode::deserialize(&hex::decode(value)?)?)
}

/// Reads a keypair written by `keygen`, checking that both halves belong
/// together
pub fn load_transport_key(path: &Path) -> Result<(Scalar, G1)> {
    let file = File::open(path).with_context(|| format!("opening keypair {}", path.display()))?;
    let pair: TransportKeypairJson = serde_json::from_reader(file)
        .with_context(|| format!("parsing keypair {}", path.display()))?;

    let private = decode(&pair.private_key).context("decoding the private key")?;
    let (private, public) = math::transport_keys_from(private)?;
    ensure!(
        public == decode::<G1>(&pair.public_key).context("decoding the public key")?,
        "the public key in {} does not match its private key",
        path.display()
    );
    Ok((private, public))
}

impl StateSummary {
    fn new(state: &DkgState, transport_key: Option<&G1>) -> Result<Self> {
        Ok(Self {
            account: state.account,
            nonce: state.nonce,
            phase: state.phase,
            phase_start: state.phase_start,
            phase_end: state.phase_end(),
            index: state.index,
            validators: state.number_of_validators,
            threshold: state.validator_threshold,
            registered: state.participants.len(),
            qualified_dealers: state
                .participants
                .values()
                .filter(|p| p.is_qualified_dealer(state.nonce))
                .count(),
            accusations: state.accusations.clone(),
            master_public_key: state.master_public_key.as_ref().map(encode).transpose()?,
            group_public_key: state.group_public_key.as_ref().map(encode).transpose()?,
            transport_key_matches: transport_key
                .map(|public| state.transport_public_key.as_ref() == Some(public)),
            completed: state.completed,
        })
    }
}

fn write_json<T: Serialize>(path: Option<String>, value: &T) -> Result<()> {
    if let Some(path) = path {
        let f = File::create(path)?;
        serde_json::to_writer_pretty(&f, value)?;
    } else {
        serde_json::to_writer_pretty(std::io::stdout(), value)?;
        println!();
    }
    Ok(())
}

pub fn keygen<R>(opts: KeygenOpts, rng: &mut R) -> Result<()>
where
    R: RngCore,
{
    let (private_key, public_key) = math::generate_transport_keys(rng);
    let output = TransportKeypairJson {
        public_key: encode(&public_key)?,
        private_key: encode(&private_key)?,
    };
    write_json(opts.path, &output)
}

pub fn inspect(opts: InspectOpts) -> Result<()> {
    let config = NodeConfig::load(&opts.config)?;
    info!(account = ?config.account, path = ?config.state_path, "opening state store");

    let transport_key = config
        .transport_key
        .as_deref()
        .map(load_transport_key)
        .transpose()?
        .map(|(_, public)| public);

    let store = DkgStore::open(&config.state_path, config.account)?;
    let summary = StateSummary::new(&store.load()?, transport_key.as_ref())?;
    write_json(None, &summary)
}

pub fn config(opts: ConfigOpts) -> Result<()> {
    write_json(opts.path, &NodeConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_core::math::G1Curve;
    use dkg_crypto::group::Curve;
    use gumdrop::Options;
    use rand::thread_rng;
    use std::path::PathBuf;

    fn generate(dir: &Path) -> PathBuf {
        let path = dir.join("keys.json");
        let opts = KeygenOpts::parse_args_default(&["--path", path.to_str().unwrap()]).unwrap();
        keygen(opts, &mut thread_rng()).unwrap();
        path
    }

    #[test]
    fn keygen_writes_a_matching_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = generate(dir.path());

        let pair: TransportKeypairJson =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        let private: Scalar = decode(&pair.private_key).unwrap();
        let public: G1 = decode(&pair.public_key).unwrap();
        assert_eq!(public, G1Curve::commit(&private));

        assert_eq!(load_transport_key(&path).unwrap(), (private, public));
    }

    #[test]
    fn mismatched_keypair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let first = generate(dir.path());
        let mut pair: TransportKeypairJson =
            serde_json::from_reader(File::open(&first).unwrap()).unwrap();

        let (_, other) = math::generate_transport_keys(&mut thread_rng());
        pair.public_key = encode(&other).unwrap();
        let path = dir.path().join("mixed.json");
        serde_json::to_writer(File::create(&path).unwrap(), &pair).unwrap();

        let err = load_transport_key(&path).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn summary_of_a_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DkgStore::open(dir.path(), Address::from_low_u64_be(3)).unwrap();
        let summary = StateSummary::new(&store.load().unwrap(), None).unwrap();

        assert_eq!(summary.account, Address::from_low_u64_be(3));
        assert_eq!(summary.nonce, 0);
        assert_eq!(summary.registered, 0);
        assert!(summary.master_public_key.is_none());
        assert!(summary.transport_key_matches.is_none());
        assert!(!summary.completed);
    }

    #[test]
    fn summary_compares_the_configured_transport_key() {
        let dir = tempfile::tempdir().unwrap();
        let (private, public) = load_transport_key(&generate(dir.path())).unwrap();

        let mut state = DkgState::new(Address::from_low_u64_be(3));
        let summary = StateSummary::new(&state, Some(&public)).unwrap();
        assert_eq!(summary.transport_key_matches, Some(false));

        state.transport_private_key = Some(private);
        state.transport_public_key = Some(public);
        let summary = StateSummary::new(&state, Some(&public)).unwrap();
        assert_eq!(summary.transport_key_matches, Some(true));
    }
}
