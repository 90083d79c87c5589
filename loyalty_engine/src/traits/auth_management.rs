use thiserror::Error;

use crate::db_types::UserAccount;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The login '{0}' is already taken")]
    LoginTaken(String),
    #[error("Invalid login or password")]
    InvalidCredentials,
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    /// Creates a new user with the given login and (already hashed) password, along with an empty balance.
    ///
    /// Returns [`AuthApiError::LoginTaken`] if the login is in use.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError>;

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, AuthApiError>;
}
