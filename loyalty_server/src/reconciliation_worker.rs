use log::*;
use loyalty_engine::{
    accrual::{AccrualClient, OrderQueue, ReconciliationOptions, ReconciliationWorker},
    SqliteDatabase,
};
use tokio::task::JoinHandle;

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconciliation_worker(
    db: SqliteDatabase,
    client: AccrualClient,
    queue: OrderQueue,
    options: ReconciliationOptions,
) -> JoinHandle<()> {
    info!(
        "🔁️ Starting reconciliation worker. Retry interval: {:?}. Accrual request timeout: {:?}",
        options.retry_interval, options.call_timeout
    );
    let worker = ReconciliationWorker::new(db, client, queue, options);
    tokio::spawn(worker.run())
}
