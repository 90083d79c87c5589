use loyalty_common::Points;
use thiserror::Error;

use crate::{
    db_types::{Balance, NewOrder, NewWithdrawal, Order, Withdrawal},
    traits::InsertOrderResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient funds. Balance: {balance}, requested: {requested}")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("'{0}' is not a valid order number")]
    InvalidOrderNumber(String),
    #[error("Cannot withdraw {0} points")]
    InvalidAmount(Points),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines behaviour for the user-facing side of the ledger: the orders a user has
/// uploaded, their balance and the withdrawals made against it.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Stores a new order. This call is idempotent on the order number: if an order with the same number already
    /// exists (for any user), it is returned unchanged as [`InsertOrderResult::AlreadyExists`].
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, AccountApiError>;

    /// All orders uploaded by the user, oldest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError>;

    /// The user's balance. Users without a balance record have a zero balance.
    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, AccountApiError>;

    /// Spends `sum` points from the user's balance against the given order number. The balance check, the
    /// withdrawal record and the balance adjustment happen atomically.
    ///
    /// Returns the updated balance, or [`AccountApiError::InsufficientFunds`] if the current balance is too low.
    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<Balance, AccountApiError>;

    /// All withdrawals made by the user, oldest first.
    async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError>;
}
