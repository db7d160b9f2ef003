use crate::{errors::StoreError, state::DkgState};
use ethers::types::Address;
use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

/// The key under which the state is stored
pub const STATE_KEY: &[u8] = b"dkg-state";

const DB_NAME: &str = "dkg";
const MAP_SIZE: usize = 64 * 1024 * 1024;

enum Backend {
    Lmdb { env: Environment, db: Database },
    Memory(Mutex<Option<Vec<u8>>>),
}

/// Persists one validator's `DkgState`.
///
/// `update` holds the backend's write transaction (or lock) while the closure
/// runs and only writes back if the closure succeeds, so a failing update
/// leaves the stored record untouched. Until anything was stored, closures
/// see a fresh state for `account`.
#[derive(Clone)]
pub struct DkgStore {
    backend: Arc<Backend>,
    account: Address,
}

impl DkgStore {
    /// Opens (or creates) an LMDB environment in the directory `path`
    pub fn open(path: impl AsRef<Path>, account: Address) -> Result<Self, StoreError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(path)?;
        let db = env.create_db(Some(DB_NAME), DatabaseFlags::empty())?;

        Ok(Self {
            backend: Arc::new(Backend::Lmdb { env, db }),
            account,
        })
    }

    pub fn in_memory(account: Address) -> Self {
        Self {
            backend: Arc::new(Backend::Memory(Mutex::new(None))),
            account,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<DkgState, StoreError> {
        match bytes {
            Some(bytes) => Ok(bincode::deserialize(bytes)?),
            None => Ok(DkgState::new(self.account)),
        }
    }

    /// Runs `f` on a snapshot of the state
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&DkgState) -> Result<T, E>,
        E: From<StoreError>,
    {
        let state = match self.backend.as_ref() {
            Backend::Lmdb { env, db } => {
                let txn = env.begin_ro_txn().map_err(StoreError::from)?;
                let state = match txn.get(*db, &STATE_KEY) {
                    Ok(bytes) => self.decode(Some(bytes))?,
                    Err(lmdb::Error::NotFound) => self.decode(None)?,
                    Err(err) => return Err(StoreError::from(err).into()),
                };
                txn.abort();
                state
            }
            Backend::Memory(bytes) => {
                let bytes = bytes.lock().map_err(|_| StoreError::Poisoned)?;
                self.decode(bytes.as_deref())?
            }
        };
        f(&state)
    }

    /// Runs `f` on the state and persists the result if `f` succeeds
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut DkgState) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self.backend.as_ref() {
            Backend::Lmdb { env, db } => {
                let mut txn = env.begin_rw_txn().map_err(StoreError::from)?;
                let mut state = match txn.get(*db, &STATE_KEY) {
                    Ok(bytes) => self.decode(Some(bytes))?,
                    Err(lmdb::Error::NotFound) => self.decode(None)?,
                    Err(err) => return Err(StoreError::from(err).into()),
                };

                // dropping the transaction without committing aborts it
                let out = f(&mut state)?;

                let bytes = bincode::serialize(&state).map_err(StoreError::from)?;
                txn.put(*db, &STATE_KEY, &bytes, WriteFlags::empty())
                    .map_err(StoreError::from)?;
                txn.commit().map_err(StoreError::from)?;
                Ok(out)
            }
            Backend::Memory(stored) => {
                let mut stored = stored.lock().map_err(|_| StoreError::Poisoned)?;
                let mut state = self.decode(stored.as_deref())?;
                let out = f(&mut state)?;
                *stored = Some(bincode::serialize(&state).map_err(StoreError::from)?);
                Ok(out)
            }
        }
    }

    /// Returns a copy of the state
    pub fn load(&self) -> Result<DkgState, StoreError> {
        self.view(|state| Ok(state.clone()))
    }
}
