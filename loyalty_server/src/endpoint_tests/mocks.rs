use loyalty_engine::{
    db_types::{Balance, NewOrder, NewWithdrawal, Order, UserAccount, Withdrawal},
    traits::{AccountApiError, AccountManagement, AuthApiError, AuthManagement, InsertOrderResult},
};
use mockall::mock;

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, AccountApiError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError>;
        async fn fetch_balance(&self, user_id: i64) -> Result<Balance, AccountApiError>;
        async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<Balance, AccountApiError>;
        async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError>;
    }
}

mock! {
    pub AuthManager {}
    impl AuthManagement for AuthManager {
        async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError>;
        async fn fetch_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, AuthApiError>;
    }
}
