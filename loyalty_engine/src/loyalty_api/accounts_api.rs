//! Unifies API for accessing user orders, balances and withdrawals.

use std::fmt::Debug;

use log::*;
use loyalty_common::Points;

use crate::{
    db_types::{Balance, NewWithdrawal, Order, OrderNumber, Withdrawal},
    traits::{AccountApiError, AccountManagement},
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// All orders the user has uploaded, oldest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance, AccountApiError> {
        self.db.fetch_balance(user_id).await
    }

    /// Spends `sum` points against the order number `order`. The order number does not have to be one the user has
    /// uploaded, but it must pass the Luhn check.
    pub async fn withdraw(&self, user_id: i64, order: &str, sum: Points) -> Result<Balance, AccountApiError> {
        let order = OrderNumber::parse(order.trim()).map_err(|e| AccountApiError::InvalidOrderNumber(e.0))?;
        if !sum.is_positive() {
            return Err(AccountApiError::InvalidAmount(sum));
        }
        let balance = self.db.withdraw(NewWithdrawal::new(user_id, order, sum)).await?;
        debug!("🧾️ User #{user_id} withdrew {sum}. New balance is {}", balance.current);
        Ok(balance)
    }

    /// All withdrawals the user has made, oldest first.
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        self.db.fetch_withdrawals(user_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[tokio::test]
    async fn withdrawals_are_validated() {
        let store = MemoryStore::new();
        store.set_balance(1, Points::from_points(100));
        let api = AccountApi::new(store);

        let err = api.withdraw(1, "12345678901", Points::from_points(10)).await.unwrap_err();
        assert_eq!(err, AccountApiError::InvalidOrderNumber("12345678901".into()));
        let err = api.withdraw(1, "2377225624", Points::zero()).await.unwrap_err();
        assert_eq!(err, AccountApiError::InvalidAmount(Points::zero()));
        let err = api.withdraw(1, "2377225624", Points::from_points(101)).await.unwrap_err();
        assert!(matches!(err, AccountApiError::InsufficientFunds { .. }));

        let balance = api.withdraw(1, "2377225624", Points::from_hundredths(2550)).await.unwrap();
        assert_eq!(balance.current, Points::from_hundredths(7450));
        assert_eq!(balance.withdrawn, Points::from_hundredths(2550));
        assert_eq!(api.withdrawals(1).await.unwrap().len(), 1);
        assert!(api.withdrawals(2).await.unwrap().is_empty());
    }
}
