use crate::{
    context::TaskContext,
    errors::{TaskError, TaskResult},
    tasks::DkgTask,
};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use tx_monitor::{Receipt, ReceiptError, TxMonitor};

/// Runs `task` once: prepare, check whether it is still needed, execute. With
/// a monitor, waits until every submitted transaction is confirmed.
///
/// Losing an accusation race counts as success and yields no receipts.
pub async fn run_task(
    ctx: &TaskContext,
    task: &DkgTask,
    monitor: Option<&TxMonitor>,
) -> TaskResult<Vec<Receipt>> {
    let task = task.as_task();
    let name = task.name();

    task.prepare(ctx).await?;
    if !task.should_execute(ctx).await? {
        debug!(task = name, "nothing to do");
        return Ok(Vec::new());
    }

    let hashes = match task.execute(ctx).await {
        Ok(hashes) => hashes,
        Err(TaskError::AlreadyAccused(targets)) => {
            info!(task = name, ?targets, "someone else already accused the targets");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let monitor = match monitor {
        Some(monitor) => monitor,
        None => return Ok(Vec::new()),
    };

    let outcomes = try_join_all(hashes.into_iter().map(|hash| monitor.wait(hash))).await;
    let receipts = match outcomes {
        Ok(receipts) => receipts,
        Err(err) => {
            if let ReceiptError::Stale { hash, .. } = &err {
                warn!(task = name, tx = ?hash, "transaction went stale, raising fees");
                ctx.record_stale();
            }
            return Err(err.into());
        }
    };

    if let Some(reverted) = receipts.iter().find(|r| !r.success) {
        return Err(TaskError::TxReverted(reverted.tx_hash));
    }
    ctx.record_mined();
    info!(task = name, transactions = receipts.len(), "confirmed");
    Ok(receipts)
}
