//! `SqliteDatabase` is the concrete storage backend of the loyalty engine.
//!
//! It implements all the traits defined in the [`crate::traits`] module. Operations that touch more than one table
//! (settling an order, withdrawing points, registering a user) run inside a single transaction.
use std::fmt::Debug;

use log::*;
use loyalty_common::Points;
use sqlx::{migrate, SqlitePool};

use super::{
    db::{balances, new_pool, orders, users, withdrawals},
    SqliteDatabaseError,
};
use crate::{
    db_types::{Balance, NewOrder, NewWithdrawal, Order, OrderNumber, OrderStatusType, UserAccount, Withdrawal},
    traits::{
        AccountApiError,
        AccountManagement,
        AccrualStore,
        AccrualStoreError,
        AuthApiError,
        AuthManagement,
        InsertOrderResult,
        SettleResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl AccrualStore for SqliteDatabase {
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, AccrualStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn update_order_status(
        &self,
        number: &OrderNumber,
        user_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<(), AccrualStoreError> {
        let mut conn = self.pool.acquire().await?;
        match orders::update_order_status(number, user_id, status, accrual, &mut conn).await? {
            0 => Err(AccrualStoreError::OrderNotFound(number.clone())),
            _ => Ok(()),
        }
    }

    async fn credit_balance(&self, user_id: i64, amount: Points) -> Result<(), AccrualStoreError> {
        let mut conn = self.pool.acquire().await?;
        balances::credit(user_id, amount, &mut conn).await?;
        trace!("🗃️ {amount} credited to user #{user_id}");
        Ok(())
    }

    /// Sets the order to `PROCESSED` and credits the accrual in one transaction. The status update is guarded on the
    /// order not being final, so a second settle of the same order changes nothing.
    async fn settle_order(
        &self,
        number: &OrderNumber,
        user_id: i64,
        accrual: Points,
    ) -> Result<SettleResult, AccrualStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(number, &mut tx)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| AccrualStoreError::OrderNotFound(number.clone()))?;
        if order.status.is_final() {
            debug!("🗃️ Order {number} is already {}. Not settling it again.", order.status);
            return Ok(SettleResult::AlreadyFinal(order.status));
        }
        if orders::mark_processed(number, user_id, accrual, &mut tx).await? == 0 {
            warn!("🗃️ Order {number} changed underneath the settle transaction. Rolling back.");
            tx.rollback().await?;
            return Ok(SettleResult::AlreadyFinal(OrderStatusType::Processed));
        }
        let credited = if accrual.is_positive() {
            balances::credit(user_id, accrual, &mut tx).await?;
            accrual
        } else {
            Points::zero()
        };
        tx.commit().await?;
        debug!("🗃️ Order {number} settled. {credited} credited to user #{user_id}");
        Ok(SettleResult::Settled(credited))
    }

    async fn fetch_unreconciled_orders(&self) -> Result<Vec<Order>, AccrualStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unreconciled_orders(&mut conn).await?;
        Ok(orders)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let balance = balances::fetch_balance(user_id, &mut conn).await?;
        Ok(balance.unwrap_or_else(|| Balance::empty(user_id)))
    }

    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<Balance, AccountApiError> {
        let user_id = withdrawal.user_id;
        let sum = withdrawal.sum;
        let mut tx = self.pool.begin().await?;
        if balances::debit(user_id, sum, &mut tx).await? == 0 {
            let balance = balances::fetch_balance(user_id, &mut tx).await?.unwrap_or_else(|| Balance::empty(user_id));
            tx.rollback().await?;
            debug!("🗃️ User #{user_id} cannot withdraw {sum}. Current balance is {}", balance.current);
            return Err(AccountApiError::InsufficientFunds { balance: balance.current, requested: sum });
        }
        let record = withdrawals::insert_withdrawal(withdrawal, &mut tx).await?;
        let balance = balances::fetch_balance(user_id, &mut tx).await?.ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} withdrew {} against order {}", record.sum, record.order);
        Ok(balance)
    }

    async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals(user_id, &mut conn).await?;
        Ok(withdrawals)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let user = match users::insert_user(login, password_hash, &mut tx).await? {
            Some(user) => user,
            None => {
                tx.rollback().await?;
                return Err(AuthApiError::LoginTaken(login.to_string()));
            },
        };
        balances::create_balance(user.id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ New user '{}' registered with id #{}", user.login, user.id);
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_login(login, &mut conn).await?;
        Ok(user)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
