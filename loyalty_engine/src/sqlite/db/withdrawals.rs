use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewWithdrawal, Withdrawal};

/// Records a withdrawal. The `RETURNING` row is read with `fetch_all` so that the insert runs to completion.
pub async fn insert_withdrawal(
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO withdrawals (user_id, order_number, sum, processed_at) VALUES ($1, $2, $3, $4)
            RETURNING user_id, order_number, sum, processed_at
        "#,
    )
    .bind(withdrawal.user_id)
    .bind(withdrawal.order.as_str())
    .bind(withdrawal.sum)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_withdrawals(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT user_id, order_number, sum, processed_at FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
