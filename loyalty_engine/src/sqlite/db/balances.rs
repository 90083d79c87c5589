use loyalty_common::Points;
use sqlx::SqliteConnection;

use crate::db_types::Balance;

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Balance>, sqlx::Error> {
    sqlx::query_as("SELECT user_id, current_balance, total_withdrawn FROM balances WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

/// Creates a zero balance for the user. Does nothing if the user already has one.
pub async fn create_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO balances (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Adds `amount` to the user's current balance, creating the balance record if it does not exist.
pub async fn credit(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO balances (user_id, current_balance, total_withdrawn) VALUES ($1, $2, 0)
            ON CONFLICT (user_id) DO UPDATE SET current_balance = current_balance + excluded.current_balance
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

/// Moves `sum` from the current balance to the withdrawn total, but only if the current balance covers it.
/// Returns the number of rows changed; zero means insufficient funds (or no balance record).
pub async fn debit(user_id: i64, sum: Points, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE balances
            SET current_balance = current_balance - $1, total_withdrawn = total_withdrawn + $1
            WHERE user_id = $2 AND current_balance >= $1
        "#,
    )
    .bind(sum)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
