use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use loyalty_common::Points;

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

/// An in-memory storage backend. Clones share state.
///
/// Reads and writes can be made to fail on demand with [`MemoryStore::fail_next_reads`] and
/// [`MemoryStore::fail_next_writes`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    orders: Vec<Order>,
    balances: HashMap<i64, Balance>,
    withdrawals: Vec<Withdrawal>,
    users: Vec<UserAccount>,
    failing_reads: usize,
    failing_writes: usize,
    credits: usize,
}

impl State {
    fn read(&mut self) -> Result<(), AccrualStoreError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(AccrualStoreError::DatabaseError("injected read failure".into()));
        }
        Ok(())
    }

    fn write(&mut self) -> Result<(), AccrualStoreError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(AccrualStoreError::DatabaseError("injected write failure".into()));
        }
        Ok(())
    }

    fn order_mut(&mut self, number: &OrderNumber, user_id: i64) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| &o.number == number && o.user_id == user_id)
    }

    fn credit(&mut self, user_id: i64, amount: Points) {
        self.balances.entry(user_id).or_insert_with(|| Balance::empty(user_id)).current += amount;
        self.credits += 1;
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores an order directly, bypassing the upload path.
    pub fn add_order(&self, number: &str, user_id: i64, status: OrderStatusType) -> Order {
        let order = Order {
            number: OrderNumber::parse(number).expect("test order numbers must be valid"),
            user_id,
            status,
            accrual: Points::zero(),
            uploaded_at: Utc::now(),
        };
        self.state().orders.push(order.clone());
        order
    }

    pub fn order(&self, number: &str) -> Option<Order> {
        self.state().orders.iter().find(|o| o.number.as_str() == number).cloned()
    }

    pub fn balance(&self, user_id: i64) -> Balance {
        self.state().balances.get(&user_id).cloned().unwrap_or_else(|| Balance::empty(user_id))
    }

    pub fn set_balance(&self, user_id: i64, current: Points) {
        self.state().balances.insert(user_id, Balance { user_id, current, withdrawn: Points::zero() });
    }

    /// The number of times any balance has been credited.
    pub fn credit_count(&self) -> usize {
        self.state().credits
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.state().failing_reads = count;
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.state().failing_writes = count;
    }
}

impl AccrualStore for MemoryStore {
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, AccrualStoreError> {
        let mut state = self.state();
        state.read()?;
        Ok(state.orders.iter().find(|o| &o.number == number).cloned())
    }

    async fn update_order_status(
        &self,
        number: &OrderNumber,
        user_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<(), AccrualStoreError> {
        let mut state = self.state();
        state.write()?;
        let order = state.order_mut(number, user_id).ok_or_else(|| AccrualStoreError::OrderNotFound(number.clone()))?;
        order.status = status;
        order.accrual = accrual;
        Ok(())
    }

    async fn credit_balance(&self, user_id: i64, amount: Points) -> Result<(), AccrualStoreError> {
        let mut state = self.state();
        state.write()?;
        state.credit(user_id, amount);
        Ok(())
    }

    async fn settle_order(
        &self,
        number: &OrderNumber,
        user_id: i64,
        accrual: Points,
    ) -> Result<SettleResult, AccrualStoreError> {
        let mut state = self.state();
        state.write()?;
        let order = state.order_mut(number, user_id).ok_or_else(|| AccrualStoreError::OrderNotFound(number.clone()))?;
        if order.status.is_final() {
            return Ok(SettleResult::AlreadyFinal(order.status));
        }
        order.status = OrderStatusType::Processed;
        order.accrual = accrual;
        if !accrual.is_positive() {
            return Ok(SettleResult::Settled(Points::zero()));
        }
        state.credit(user_id, accrual);
        Ok(SettleResult::Settled(accrual))
    }

    async fn fetch_unreconciled_orders(&self) -> Result<Vec<Order>, AccrualStoreError> {
        let mut state = self.state();
        state.read()?;
        Ok(state.orders.iter().filter(|o| !o.status.is_final()).cloned().collect())
    }
}

impl AccountManagement for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, AccountApiError> {
        let mut state = self.state();
        if let Some(existing) = state.orders.iter().find(|o| o.number == order.number) {
            return Ok(InsertOrderResult::AlreadyExists(existing.clone()));
        }
        let order = Order {
            number: order.number,
            user_id: order.user_id,
            status: OrderStatusType::New,
            accrual: Points::zero(),
            uploaded_at: order.uploaded_at,
        };
        state.orders.push(order.clone());
        Ok(InsertOrderResult::Inserted(order))
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        Ok(self.state().orders.iter().filter(|o| o.user_id == user_id).cloned().collect())
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, AccountApiError> {
        Ok(self.balance(user_id))
    }

    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<Balance, AccountApiError> {
        let mut state = self.state();
        let user_id = withdrawal.user_id;
        let balance = state.balances.entry(user_id).or_insert_with(|| Balance::empty(user_id));
        if balance.current < withdrawal.sum {
            return Err(AccountApiError::InsufficientFunds { balance: balance.current, requested: withdrawal.sum });
        }
        balance.current -= withdrawal.sum;
        balance.withdrawn += withdrawal.sum;
        let balance = balance.clone();
        state.withdrawals.push(Withdrawal {
            user_id,
            order: withdrawal.order,
            sum: withdrawal.sum,
            processed_at: Utc::now(),
        });
        Ok(balance)
    }

    async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        Ok(self.state().withdrawals.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }
}

impl AuthManagement for MemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.login == login) {
            return Err(AuthApiError::LoginTaken(login.to_string()));
        }
        #[allow(clippy::cast_possible_wrap)]
        let id = state.users.len() as i64 + 1;
        let user = UserAccount {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        state.balances.insert(id, Balance::empty(id));
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, AuthApiError> {
        Ok(self.state().users.iter().find(|u| u.login == login).cloned())
    }
}
