use crate::{
    config::DkgConfig,
    contract::DkgContract,
    errors::{TaskError, TaskResult},
    math::Scalar,
    store::DkgStore,
};
use ethers::types::{Address, H256};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time;
use tx_monitor::{CallOpts, Ledger, LedgerError, TxOpts};

/// Everything a task needs to talk to the outside world. Passed explicitly to
/// every task operation.
#[derive(Clone)]
pub struct TaskContext {
    pub ledger: Arc<dyn Ledger>,
    pub contract: Arc<dyn DkgContract>,
    pub store: DkgStore,
    pub account: Address,
    pub config: DkgConfig,
    /// Registered instead of a fresh transport key when set
    pub transport_key: Option<Scalar>,
    /// Consecutive stale submissions, each one raising the fees once more
    fee_bumps: Arc<AtomicU64>,
}

impl TaskContext {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        contract: Arc<dyn DkgContract>,
        store: DkgStore,
        config: DkgConfig,
    ) -> Self {
        Self {
            ledger,
            contract,
            account: store.account(),
            store,
            config,
            transport_key: None,
            fee_bumps: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers `private` as the transport key in every run
    pub fn with_transport_key(mut self, private: Scalar) -> Self {
        self.transport_key = Some(private);
        self
    }

    async fn bounded<T, E, F>(limit: Duration, what: &'static str, fut: F) -> TaskResult<T>
    where
        F: Future<Output = Result<T, E>>,
        TaskError: From<E>,
    {
        match time::timeout(limit, fut).await {
            Ok(res) => res.map_err(TaskError::from),
            Err(_) => Err(TaskError::Timeout(what)),
        }
    }

    /// Bounds a read by the call timeout. The call is dropped, and with it the
    /// underlying request, once the timeout expires.
    pub async fn call<T, E, F>(&self, what: &'static str, fut: F) -> TaskResult<T>
    where
        F: Future<Output = Result<T, E>>,
        TaskError: From<E>,
    {
        Self::bounded(self.config.call_timeout(), what, fut).await
    }

    /// Bounds a transaction submission by the transaction timeout
    pub async fn send<T, E, F>(&self, what: &'static str, fut: F) -> TaskResult<T>
    where
        F: Future<Output = Result<T, E>>,
        TaskError: From<E>,
    {
        Self::bounded(self.config.tx_timeout(), what, fut).await
    }

    pub async fn call_opts(&self) -> TaskResult<CallOpts> {
        self.call("call options", self.ledger.call_opts(self.account))
            .await
    }

    /// Transaction options with the fees raised for every stale submission in a
    /// row
    pub async fn tx_opts(&self) -> TaskResult<TxOpts> {
        let opts = self
            .call("transaction options", self.ledger.tx_opts(self.account))
            .await?;
        let bumps = self.fee_bumps.load(Ordering::SeqCst);
        Ok(opts.bumped(bumps * self.config.fee_bump_percent))
    }

    pub(crate) fn record_stale(&self) {
        self.fee_bumps.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_mined(&self) {
        self.fee_bumps.store(0, Ordering::SeqCst);
    }

    pub async fn current_block(&self) -> TaskResult<u64> {
        self.call("block number", self.ledger.block_number()).await
    }

    pub async fn block_hash(&self, number: u64) -> TaskResult<H256> {
        let header = self
            .call("block header", self.ledger.block_header(number))
            .await?;
        header
            .map(|h| h.hash)
            .ok_or(TaskError::Ledger(LedgerError::MissingField("block header")))
    }
}
