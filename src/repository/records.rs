//! Borrowing records queries (PostgreSQL)

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::record::{BorrowingRecord, NewBorrowingRecord},
};

const SELECT_BY_ID: &str = "SELECT * FROM borrowing_records WHERE id = $1";
/// Row lock that still lets other transactions insert rows referencing this one
pub(super) const LOCK_BY_ID: &str = "SELECT * FROM borrowing_records WHERE id = $1 FOR NO KEY UPDATE";

pub async fn insert(conn: &mut PgConnection, record: &NewBorrowingRecord) -> AppResult<BorrowingRecord> {
    let row = sqlx::query_as::<_, BorrowingRecord>(
        r#"
        INSERT INTO borrowing_records (user_id, book_id, request_id, borrow_date, due_date, is_returned)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        RETURNING *
        "#,
    )
    .bind(record.user_id)
    .bind(&record.book_id)
    .bind(record.request_id)
    .bind(record.borrow_date)
    .bind(record.due_date)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn get(conn: &mut PgConnection, id: i32, for_update: bool) -> AppResult<Option<BorrowingRecord>> {
    let sql = if for_update { LOCK_BY_ID } else { SELECT_BY_ID };
    let row = sqlx::query_as::<_, BorrowingRecord>(sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn mark_returned(
    conn: &mut PgConnection,
    id: i32,
    return_date: DateTime<Utc>,
) -> AppResult<BorrowingRecord> {
    // The is_returned guard makes a second return a no-op even without the row lock.
    sqlx::query_as::<_, BorrowingRecord>(
        r#"
        UPDATE borrowing_records
        SET return_date = $2, is_returned = TRUE
        WHERE id = $1 AND is_returned = FALSE
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(return_date)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::AlreadyReturned(format!("Borrowing record {} already returned", id)))
}

pub async fn list(conn: &mut PgConnection, user_id: Option<i32>) -> AppResult<Vec<BorrowingRecord>> {
    let rows = sqlx::query_as::<_, BorrowingRecord>(
        r#"
        SELECT * FROM borrowing_records
        WHERE ($1::INTEGER IS NULL OR user_id = $1)
        ORDER BY borrow_date DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn count_active(conn: &mut PgConnection, book_id: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM borrowing_records WHERE book_id = $1 AND is_returned = FALSE",
    )
    .bind(book_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}
