use crate::{
    config::MonitorConfig,
    errors::{LedgerError, ReceiptError},
    ledger::{Ledger, Receipt, TxLookup},
};
use ethers::types::H256;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot, Notify},
    task::{JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Capacity of the request queue in front of the coordinator
const REQUEST_QUEUE: usize = 64;

type Outcome = Result<Receipt, ReceiptError>;

struct Request {
    hash: H256,
    responder: oneshot::Sender<Outcome>,
}

/// The caller's end of a tracked transaction. Dropping it cancels tracking.
#[derive(Debug)]
pub struct ReceiptHandle {
    hash: H256,
    rx: oneshot::Receiver<Outcome>,
}

impl ReceiptHandle {
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Waits for the final outcome
    pub async fn receipt(self) -> Outcome {
        self.rx.await.unwrap_or(Err(ReceiptError::Shutdown))
    }

    /// Returns the outcome if it has already been delivered
    pub fn try_receipt(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ReceiptError::Shutdown)),
        }
    }
}

/// Tracks submitted transactions until each one is confirmed, stale or dropped.
///
/// A single coordinator task owns the registry of tracked transactions. On
/// every poll it hands the registry's hashes to a bounded set of workers which
/// query the ledger and push what they saw to an output queue; the coordinator
/// drains that queue and is the only one to touch the registry.
pub struct TxMonitor {
    requests: mpsc::Sender<Request>,
    tracked: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl TxMonitor {
    /// Starts the coordinator on the current tokio runtime
    pub fn spawn(ledger: Arc<dyn Ledger>, config: MonitorConfig) -> Self {
        let (requests, rx) = mpsc::channel(REQUEST_QUEUE);
        let tracked = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let coordinator = Coordinator {
            ledger,
            config,
            registry: HashMap::new(),
            tracked: tracked.clone(),
        };
        let handle = tokio::spawn(coordinator.run(rx, shutdown.clone()));

        Self {
            requests,
            tracked,
            shutdown,
            handle,
        }
    }

    /// Starts tracking `hash`
    pub async fn track(&self, hash: H256) -> Result<ReceiptHandle, ReceiptError> {
        let (responder, rx) = oneshot::channel();
        self.requests
            .send(Request { hash, responder })
            .await
            .map_err(|_| ReceiptError::Shutdown)?;
        Ok(ReceiptHandle { hash, rx })
    }

    /// Tracks `hash` and waits for its outcome
    pub async fn wait(&self, hash: H256) -> Outcome {
        self.track(hash).await?.receipt().await
    }

    /// Number of transactions currently tracked
    pub fn tracked(&self) -> usize {
        self.tracked.load(Ordering::SeqCst)
    }

    /// Stops the coordinator, aborting in-flight queries. Callers still waiting
    /// get `ReceiptError::Shutdown`.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "transaction monitor did not stop cleanly");
        }
    }
}

struct Entry {
    responder: oneshot::Sender<Outcome>,
    /// Head at the first poll after tracking began
    start_block: Option<u64>,
}

/// What a worker learned about one transaction
struct Observation {
    hash: H256,
    lookup: Result<TxLookup, LedgerError>,
}

struct Coordinator {
    ledger: Arc<dyn Ledger>,
    config: MonitorConfig,
    registry: HashMap<H256, Entry>,
    tracked: Arc<AtomicUsize>,
}

impl Coordinator {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>, shutdown: Arc<Notify>) {
        let mut ticker = time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (output, mut observations) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        // head observed when the current batch was dispatched
        let mut round_head = None;

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_workers = self.config.max_workers,
            "transaction monitor started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => break,

                Some(observation) = observations.recv() => {
                    if let Some(head) = round_head {
                        self.reconcile(observation, head);
                    }
                }

                request = requests.recv() => match request {
                    Some(request) => self.insert(request),
                    None => break,
                },

                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "monitor worker failed");
                    }
                }

                _ = ticker.tick(), if workers.is_empty() => {
                    round_head = self.dispatch(&mut workers, &output).await;
                }
            }
        }

        workers.abort_all();
        info!(
            abandoned = self.registry.len(),
            "transaction monitor stopped"
        );
    }

    fn insert(&mut self, request: Request) {
        if self.registry.contains_key(&request.hash) {
            let _ = request
                .responder
                .send(Err(ReceiptError::AlreadyTracked(request.hash)));
            return;
        }

        debug!(hash = ?request.hash, "tracking transaction");
        self.registry.insert(
            request.hash,
            Entry {
                responder: request.responder,
                start_block: None,
            },
        );
        self.update_gauge();
    }

    /// Drops entries whose caller is gone
    fn prune_cancelled(&mut self) {
        let before = self.registry.len();
        self.registry.retain(|_, entry| !entry.responder.is_closed());
        if self.registry.len() != before {
            debug!(
                cancelled = before - self.registry.len(),
                "dropped cancelled transactions"
            );
            self.update_gauge();
        }
    }

    /// Reads the head and hands every tracked hash to a worker. Returns the
    /// head the observations must be judged against.
    async fn dispatch(
        &mut self,
        workers: &mut JoinSet<()>,
        output: &mpsc::UnboundedSender<Observation>,
    ) -> Option<u64> {
        self.prune_cancelled();
        if self.registry.is_empty() {
            return None;
        }

        let limit = self.config.request_timeout();
        let head = match time::timeout(limit, self.ledger.block_number()).await {
            Ok(Ok(head)) => head,
            Ok(Err(err)) => {
                warn!(error = %err, "could not read the ledger head");
                return None;
            }
            Err(_) => {
                warn!("timed out reading the ledger head");
                return None;
            }
        };

        let mut hashes = Vec::with_capacity(self.registry.len());
        for (hash, entry) in self.registry.iter_mut() {
            entry.start_block.get_or_insert(head);
            hashes.push(*hash);
        }

        let n_workers = self.config.workers_for(hashes.len());
        let per_worker = (hashes.len() + n_workers - 1) / n_workers;
        for batch in hashes.chunks(per_worker) {
            let batch = batch.to_vec();
            let ledger = self.ledger.clone();
            let output = output.clone();
            workers.spawn(async move {
                for hash in batch {
                    let lookup = observe(ledger.as_ref(), hash, limit).await;
                    if output.send(Observation { hash, lookup }).is_err() {
                        return;
                    }
                }
            });
        }

        debug!(head, tracked = hashes.len(), workers = n_workers, "polling");
        Some(head)
    }

    fn reconcile(&mut self, observation: Observation, head: u64) {
        let Observation { hash, lookup } = observation;
        let entry = match self.registry.get(&hash) {
            Some(entry) => entry,
            None => return,
        };
        if entry.responder.is_closed() {
            debug!(?hash, "caller went away, untracking");
            self.registry.remove(&hash);
            self.update_gauge();
            return;
        }

        let waited = head.saturating_sub(entry.start_block.unwrap_or(head));
        let outcome = match lookup {
            Err(err) => {
                debug!(?hash, error = %err, "lookup failed, retrying on next poll");
                None
            }
            Ok(TxLookup::Unknown) if waited > self.config.tx_not_found_max_blocks => {
                Some(Err(ReceiptError::NotFound {
                    hash,
                    blocks: waited,
                }))
            }
            Ok(TxLookup::Pending) if waited > self.config.tx_max_stale_blocks => {
                Some(Err(ReceiptError::Stale {
                    hash,
                    blocks: waited,
                }))
            }
            Ok(TxLookup::Mined(receipt))
                if head >= receipt.block_number + self.config.tx_confirmation_blocks =>
            {
                Some(Ok(receipt))
            }
            Ok(_) => None,
        };

        if let Some(outcome) = outcome {
            self.deliver(hash, outcome);
        }
    }

    fn deliver(&mut self, hash: H256, outcome: Outcome) {
        if let Some(entry) = self.registry.remove(&hash) {
            match &outcome {
                Ok(receipt) => info!(
                    ?hash,
                    block = receipt.block_number,
                    success = receipt.success,
                    "transaction confirmed"
                ),
                Err(err) => warn!(?hash, error = %err, "transaction failed"),
            }
            // the caller may have left in the meantime, that's fine
            let _ = entry.responder.send(outcome);
        }
        self.update_gauge();
    }

    fn update_gauge(&self) {
        self.tracked.store(self.registry.len(), Ordering::SeqCst);
    }
}

/// Looks up one transaction. A receipt whose block is no longer canonical
/// counts as pending.
async fn observe(ledger: &dyn Ledger, hash: H256, limit: Duration) -> Result<TxLookup, LedgerError> {
    let lookup = time::timeout(limit, ledger.transaction(hash))
        .await
        .map_err(|_| LedgerError::Timeout)??;

    if let TxLookup::Mined(receipt) = &lookup {
        let header = time::timeout(limit, ledger.block_header(receipt.block_number))
            .await
            .map_err(|_| LedgerError::Timeout)??;
        if header.map(|h| h.hash) != Some(receipt.block_hash) {
            debug!(?hash, block = receipt.block_number, "receipt block was re-orged out");
            return Ok(TxLookup::Pending);
        }
    }

    Ok(lookup)
}
