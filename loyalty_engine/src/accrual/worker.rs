use std::time::Duration;

use log::*;
use loyalty_common::Points;
use tokio::time::{timeout, Instant};

use super::{
    AccrualOutcome,
    AccrualResponse,
    AccrualSource,
    Backoff,
    OrderQueue,
    OrderQueueProducer,
    PendingOrder,
    RemoteStatus,
};
use crate::{
    db_types::{Order, OrderStatusType},
    traits::{AccrualStore, AccrualStoreError, SettleResult},
};

/// Minimum time between two consecutive queries about the same order.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// An order that cannot be found in storage is looked up this many times before it is dropped.
pub const MAX_MISSING_READS: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct ReconciliationOptions {
    /// Orders that are not final yet are not queried again before this much time has passed. This is also the
    /// shortest pause applied when the accrual service rate limits us.
    pub retry_interval: Duration,
    /// Upper bound on a single accrual query.
    pub call_timeout: Duration,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self { retry_interval: DEFAULT_RETRY_INTERVAL, call_timeout: super::DEFAULT_REQUEST_TIMEOUT }
    }
}

/// What happened to an order during one pass of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The accrual service rate limited us. All requests pause for the given time.
    RateLimited(Duration),
    /// The accrual service does not know about the order yet.
    NotYetKnown,
    /// The accrual service could not be reached or gave a response we could not use.
    TransientFailure,
    /// The accrual service is still working on the order.
    Processing,
    /// The accrual service rejected the order. It is now `INVALID`.
    Rejected,
    /// The order is now `PROCESSED` and the given amount was credited to its owner.
    Settled(Points),
    /// The order was already final when we looked at it. Nothing was done.
    AlreadyFinal(OrderStatusType),
    /// The order could not be found in storage. It gets another pass.
    NotStored,
    /// The order could not be found in storage after repeated lookups, or vanished mid-update. It is dropped.
    Missing,
    /// Storage could not be read or written. The order gets another full pass.
    StoreFailure,
}

impl Attempt {
    /// Whether the order goes back on the queue after this attempt.
    pub fn should_requeue(&self) -> bool {
        matches!(
            self,
            Attempt::RateLimited(_) |
                Attempt::NotYetKnown |
                Attempt::TransientFailure |
                Attempt::Processing |
                Attempt::NotStored |
                Attempt::StoreFailure
        )
    }
}

/// The reconciliation control loop. Pulls one order at a time from the queue, asks the accrual source about it,
/// records what it learns and puts unfinished orders back on the queue.
pub struct ReconciliationWorker<B, S> {
    store: B,
    source: S,
    queue: OrderQueue,
    requeue: OrderQueueProducer,
    backoff: Backoff,
    options: ReconciliationOptions,
}

impl<B, S> ReconciliationWorker<B, S>
where
    B: AccrualStore,
    S: AccrualSource,
{
    pub fn new(store: B, source: S, queue: OrderQueue, options: ReconciliationOptions) -> Self {
        let requeue = queue.producer();
        Self { store, source, queue, requeue, backoff: Backoff::new(), options }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn queue(&self) -> &OrderQueue {
        &self.queue
    }

    /// A producer feeding this worker's queue.
    pub fn queue_producer(&self) -> OrderQueueProducer {
        self.requeue.clone()
    }

    /// Runs until the queue is closed, which does not happen while the worker is alive.
    pub async fn run(mut self) {
        info!("🔁️ Reconciliation worker started with {} orders pending", self.queue.len());
        while self.step().await.is_some() {}
        warn!("🔁️ Reconciliation queue closed. The worker is shutting down");
    }

    /// Performs one iteration: take the next order, reconcile it, requeue it if it is not final, and sleep off any
    /// rate-limit delay. Returns `None` only if the queue is closed.
    ///
    /// Requeued orders are never eligible again before `retry_interval` has passed, whatever the outcome.
    pub async fn step(&mut self) -> Option<Attempt> {
        let item = self.queue.next().await?;
        if let Some(not_before) = item.not_before {
            tokio::time::sleep_until(not_before).await;
        }
        let attempt = self.reconcile(&item).await;
        trace!("🔁️ Order {} (attempt {}): {attempt:?}", item.order.number, item.attempts + 1);
        if attempt.should_requeue() {
            let not_before = Some(Instant::now() + self.options.retry_interval);
            let item = match attempt {
                Attempt::NotStored => item.retry_missing(not_before),
                _ => item.retry(not_before),
            };
            self.requeue.requeue(item);
        }
        self.backoff.wait().await;
        Some(attempt)
    }

    async fn reconcile(&mut self, queued: &PendingOrder) -> Attempt {
        let number = &queued.order.number;
        let order = match self.store.fetch_order(number).await {
            Ok(Some(order)) => order,
            Ok(None) if queued.missing_reads + 1 < MAX_MISSING_READS => {
                warn!(
                    "🔁️ Order {number} is not in storage (attempt {}). Looking again in {:?}.",
                    queued.attempts + 1,
                    self.options.retry_interval
                );
                return Attempt::NotStored;
            },
            Ok(None) => {
                error!(
                    "🔁️ Order {number} was queued for reconciliation but is still not in storage after {} attempts. \
                     Dropping it.",
                    queued.attempts + 1
                );
                return Attempt::Missing;
            },
            Err(e) => {
                error!("🔁️ Could not read order {number}: {e}. It will be retried.");
                return Attempt::StoreFailure;
            },
        };
        if order.status.is_final() {
            debug!("🔁️ Order {number} is already {}. Dropping it from the queue.", order.status);
            return Attempt::AlreadyFinal(order.status);
        }
        let outcome = match timeout(self.options.call_timeout, self.source.fetch_accrual(number)).await {
            Ok(outcome) => outcome,
            Err(_) => AccrualOutcome::TransientFailure(format!("No answer within {:?}", self.options.call_timeout)),
        };
        match outcome {
            AccrualOutcome::RateLimited(requested) => {
                let delay = requested.max(self.options.retry_interval);
                info!("🔁️ Accrual service is rate limiting us (asked for {requested:?}). Pausing for {delay:?}");
                self.backoff.set(delay);
                Attempt::RateLimited(delay)
            },
            AccrualOutcome::NotYetKnown => {
                debug!("🔁️ Accrual service does not know order {number} yet");
                Attempt::NotYetKnown
            },
            AccrualOutcome::TransientFailure(reason) => {
                warn!("🔁️ Accrual query for order {number} failed: {reason}");
                Attempt::TransientFailure
            },
            AccrualOutcome::Success(response) => self.apply(&order, response).await,
        }
    }

    async fn apply(&self, order: &Order, response: AccrualResponse) -> Attempt {
        let number = &order.number;
        match response.status {
            RemoteStatus::Registered | RemoteStatus::Processing => {
                if order.status == OrderStatusType::Processing {
                    trace!("🔁️ Order {number} is still being processed");
                    return Attempt::Processing;
                }
                let result = self
                    .store
                    .update_order_status(number, order.user_id, OrderStatusType::Processing, Points::zero())
                    .await;
                match result {
                    Ok(()) => {
                        debug!("🔁️ Order {number} is now PROCESSING");
                        Attempt::Processing
                    },
                    Err(e) => store_failure(order, e),
                }
            },
            RemoteStatus::Invalid => {
                let result = self
                    .store
                    .update_order_status(number, order.user_id, OrderStatusType::Invalid, Points::zero())
                    .await;
                match result {
                    Ok(()) => {
                        info!("🔁️ Order {number} was rejected by the accrual service. It is now INVALID");
                        Attempt::Rejected
                    },
                    Err(e) => store_failure(order, e),
                }
            },
            RemoteStatus::Processed => {
                let accrual = response.accrual.unwrap_or_default();
                match self.store.settle_order(number, order.user_id, accrual).await {
                    Ok(SettleResult::Settled(credited)) => {
                        info!("🔁️ Order {number} is PROCESSED. {credited} points credited to user #{}", order.user_id);
                        Attempt::Settled(credited)
                    },
                    Ok(SettleResult::AlreadyFinal(status)) => {
                        debug!("🔁️ Order {number} was settled elsewhere and is {status}");
                        Attempt::AlreadyFinal(status)
                    },
                    Err(e) => store_failure(order, e),
                }
            },
        }
    }
}

/// Puts every order that is not final yet back on the queue. The queue lives in memory, so this is how orders that
/// were pending when the process stopped get reconciled after a restart.
pub async fn restore_pending_orders<B: AccrualStore>(
    store: &B,
    producer: &OrderQueueProducer,
) -> Result<usize, AccrualStoreError> {
    let orders = store.fetch_unreconciled_orders().await?;
    let count = orders.len();
    orders.into_iter().for_each(|o| producer.enqueue(o));
    info!("🔁️ {count} unreconciled orders restored to the queue");
    Ok(count)
}

fn store_failure(order: &Order, e: AccrualStoreError) -> Attempt {
    match e {
        AccrualStoreError::OrderNotFound(_) => {
            error!("🔁️ Order {} disappeared from storage during reconciliation. Dropping it.", order.number);
            Attempt::Missing
        },
        AccrualStoreError::DatabaseError(e) => {
            error!("🔁️ Could not record the accrual status of order {}: {e}. It will be retried.", order.number);
            Attempt::StoreFailure
        },
    }
}
