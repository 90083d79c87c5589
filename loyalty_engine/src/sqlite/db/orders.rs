use log::{debug, trace};
use loyalty_common::Points;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType},
    traits::InsertOrderResult,
};

/// Inserts the order unless an order with the same number already exists. In that case the existing order is
/// returned untouched, whoever it belongs to.
///
/// `RETURNING` rows are collected with `fetch_all`. The statement must be stepped to completion before SQLite applies
/// the insert, so stopping after the first row would leave the order invisible to other connections.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<InsertOrderResult, sqlx::Error> {
    let inserted: Vec<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (number, user_id, status, accrual, uploaded_at)
            VALUES ($1, $2, 'NEW', 0, $3)
            ON CONFLICT (number) DO NOTHING
            RETURNING number, user_id, status, accrual, uploaded_at
        "#,
    )
    .bind(order.number.as_str())
    .bind(order.user_id)
    .bind(order.uploaded_at)
    .fetch_all(&mut *conn)
    .await?;
    match inserted.into_iter().next() {
        Some(order) => {
            debug!("🗃️ Order {} saved for user #{}", order.number, order.user_id);
            Ok(InsertOrderResult::Inserted(order))
        },
        None => {
            let existing = fetch_order_by_number(&order.number, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            trace!("🗃️ Order {} already exists", existing.number);
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
    }
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT number, user_id, status, accrual, uploaded_at FROM orders WHERE number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await
}

/// Orders belonging to the user, oldest upload first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT number, user_id, status, accrual, uploaded_at FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at ASC, rowid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

/// Every order whose status is not final, oldest upload first.
pub async fn fetch_unreconciled_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT number, user_id, status, accrual, uploaded_at FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at ASC, rowid ASC
        "#,
    )
    .fetch_all(conn)
    .await
}

/// Sets status and accrual on the order. Returns the number of rows changed, which is zero when the number and user
/// do not match any order.
pub async fn update_order_status(
    number: &OrderNumber,
    user_id: i64,
    status: OrderStatusType,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = $1, accrual = $2 WHERE number = $3 AND user_id = $4")
        .bind(status.to_string())
        .bind(accrual)
        .bind(number.as_str())
        .bind(user_id)
        .execute(conn)
        .await?;
    trace!("🗃️ Order {number} set to {status}");
    Ok(result.rows_affected())
}

/// Moves the order to `PROCESSED` provided it is not final yet. Returns the number of rows changed; zero means the
/// order was already settled (or rejected) by someone else.
pub async fn mark_processed(
    number: &OrderNumber,
    user_id: i64,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET status = 'PROCESSED', accrual = $1
            WHERE number = $2 AND user_id = $3 AND status NOT IN ('PROCESSED', 'INVALID')
        "#,
    )
    .bind(accrual)
    .bind(number.as_str())
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
