use loyalty_common::Points;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType},
    traits::SettleResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccrualStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

impl From<sqlx::Error> for AccrualStoreError {
    fn from(e: sqlx::Error) -> Self {
        AccrualStoreError::DatabaseError(e.to_string())
    }
}

/// The storage operations the reconciliation worker relies on.
///
/// The worker re-reads every order before querying the accrual service and only ever moves orders forward through
/// `NEW -> PROCESSING -> {INVALID | PROCESSED}`.
#[allow(async_fn_in_trait)]
pub trait AccrualStore {
    /// Fetches the current state of the order. Returns `None` if no such order exists.
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, AccrualStoreError>;

    /// Sets the status and accrual of the order belonging to `user_id`.
    ///
    /// Returns [`AccrualStoreError::OrderNotFound`] if no order matches both the number and the user.
    async fn update_order_status(
        &self,
        number: &OrderNumber,
        user_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<(), AccrualStoreError>;

    /// Adds `amount` to the user's current balance, creating the balance record if necessary.
    async fn credit_balance(&self, user_id: i64, amount: Points) -> Result<(), AccrualStoreError>;

    /// Marks the order as `PROCESSED` with the given accrual and credits a positive accrual to the owner's balance.
    ///
    /// Implementations must perform the status change and the credit as one atomic unit, and must not touch an order
    /// that is already `PROCESSED` or `INVALID`. This is what guarantees an accrual is credited at most once.
    async fn settle_order(
        &self,
        number: &OrderNumber,
        user_id: i64,
        accrual: Points,
    ) -> Result<SettleResult, AccrualStoreError>;

    /// Fetches every order that is not yet in a final state, oldest first. Used to rebuild the pending queue after a
    /// restart.
    async fn fetch_unreconciled_orders(&self) -> Result<Vec<Order>, AccrualStoreError>;
}
