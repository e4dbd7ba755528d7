//! Notifications queries (PostgreSQL)

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::notification::{NewNotification, Notification},
};

pub async fn insert(conn: &mut PgConnection, notification: &NewNotification) -> AppResult<Notification> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, message, category, is_read, created_at)
        VALUES ($1, $2, $3, FALSE, $4)
        RETURNING *
        "#,
    )
    .bind(notification.user_id)
    .bind(&notification.message)
    .bind(notification.category)
    .bind(notification.created_at)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn list_for_user(conn: &mut PgConnection, user_id: i32) -> AppResult<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn mark_read(conn: &mut PgConnection, id: i32, user_id: i32) -> AppResult<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn delete(conn: &mut PgConnection, id: i32, user_id: i32) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
