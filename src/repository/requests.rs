//! Borrow requests queries (PostgreSQL)

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::RequestStatus,
        request::{BorrowRequest, NewBorrowRequest},
    },
};

const SELECT_BY_ID: &str = "SELECT * FROM borrow_requests WHERE id = $1";
/// Row lock that still lets other transactions insert rows referencing this one
pub(super) const LOCK_BY_ID: &str = "SELECT * FROM borrow_requests WHERE id = $1 FOR NO KEY UPDATE";

pub async fn insert(conn: &mut PgConnection, request: &NewBorrowRequest) -> AppResult<BorrowRequest> {
    let row = sqlx::query_as::<_, BorrowRequest>(
        r#"
        INSERT INTO borrow_requests (user_id, book_id, status, profile_picture, request_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.user_id)
    .bind(&request.book_id)
    .bind(RequestStatus::Pending)
    .bind(&request.profile_picture)
    .bind(request.request_date)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn get(conn: &mut PgConnection, id: i32, for_update: bool) -> AppResult<Option<BorrowRequest>> {
    let sql = if for_update { LOCK_BY_ID } else { SELECT_BY_ID };
    let row = sqlx::query_as::<_, BorrowRequest>(sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn update_status(
    conn: &mut PgConnection,
    id: i32,
    status: RequestStatus,
    decided_at: DateTime<Utc>,
    decided_by: i32,
) -> AppResult<BorrowRequest> {
    sqlx::query_as::<_, BorrowRequest>(
        r#"
        UPDATE borrow_requests
        SET status = $2, decided_at = $3, decided_by = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(decided_at)
    .bind(decided_by)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
}

pub async fn list(
    conn: &mut PgConnection,
    user_id: Option<i32>,
    status: Option<RequestStatus>,
) -> AppResult<Vec<BorrowRequest>> {
    let rows = sqlx::query_as::<_, BorrowRequest>(
        r#"
        SELECT * FROM borrow_requests
        WHERE ($1::INTEGER IS NULL OR user_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY request_date DESC, id DESC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn delete_all(conn: &mut PgConnection) -> AppResult<Vec<BorrowRequest>> {
    let rows = sqlx::query_as::<_, BorrowRequest>("DELETE FROM borrow_requests RETURNING *")
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn count_pending(conn: &mut PgConnection, book_id: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM borrow_requests WHERE book_id = $1 AND status = $2",
    )
    .bind(book_id)
    .bind(RequestStatus::Pending)
    .fetch_one(conn)
    .await?;
    Ok(count)
}
