use std::fmt::Debug;

use log::*;

use crate::{
    db_types::UserAccount,
    traits::{AuthApiError, AuthManagement},
};

pub struct AuthApi<B> {
    db: B,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: AuthManagement
{
    /// Registers a new user. Passwords must already be hashed.
    pub async fn register(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError> {
        self.db.create_user(login, password_hash).await
    }

    /// Returns the user if `login` exists and `password_hash` matches the stored hash.
    pub async fn authenticate(&self, login: &str, password_hash: &str) -> Result<UserAccount, AuthApiError> {
        match self.db.fetch_user_by_login(login).await? {
            Some(user) if user.password_hash == password_hash => Ok(user),
            Some(_) => {
                debug!("🔐️ Wrong password for '{login}'");
                Err(AuthApiError::InvalidCredentials)
            },
            None => {
                debug!("🔐️ Unknown login '{login}'");
                Err(AuthApiError::InvalidCredentials)
            },
        }
    }
}
