//! Credential storage. Passwords arrive here already hashed; this module never sees a plain-text password.
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::UserAccount;

/// Inserts a new user. Returns `None` if the login is taken.
pub async fn insert_user(
    login: &str,
    password_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO users (login, password_hash, created_at) VALUES ($1, $2, $3)
            ON CONFLICT (login) DO NOTHING
            RETURNING id, login, password_hash, created_at
        "#,
    )
    .bind(login)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_all(conn)
    .await
    .map(|rows: Vec<UserAccount>| rows.into_iter().next())
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT id, login, password_hash, created_at FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(conn)
        .await
}
