//! # Order reconciliation
//!
//! Orders uploaded by users are worth an amount of points that only the external accrual service can tell us, and it
//! tells us asynchronously. This module keeps asking until every order reaches a final state.
//!
//! * [`AccrualClient`] asks the accrual service about one order and classifies the answer as an [`AccrualOutcome`].
//! * [`OrderQueue`] holds orders awaiting reconciliation. Request handlers push onto it with an
//!   [`OrderQueueProducer`]; the worker is the only consumer.
//! * [`Backoff`] remembers how long the accrual service asked us to stay away after rate limiting us.
//! * [`ReconciliationWorker`] ties these together with an [`AccrualStore`](crate::traits::AccrualStore), moving each
//!   order through `NEW -> PROCESSING -> {INVALID | PROCESSED}` and crediting the owner's balance exactly once.
mod backoff;
mod client;
mod queue;
mod source;
mod worker;

pub use backoff::Backoff;
pub use client::{AccrualClient, AccrualClientConfig, AccrualClientError, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_AFTER};
pub use queue::{OrderQueue, OrderQueueProducer, PendingOrder};
pub use source::{AccrualOutcome, AccrualResponse, AccrualSource, RemoteStatus};
pub use worker::{
    restore_pending_orders,
    Attempt,
    ReconciliationOptions,
    ReconciliationWorker,
    DEFAULT_RETRY_INTERVAL,
    MAX_MISSING_READS,
};
