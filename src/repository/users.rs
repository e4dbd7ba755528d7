//! Users queries (PostgreSQL)

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::user::User,
};

const SELECT_BY_ID: &str = "SELECT * FROM users WHERE id = $1";
/// Row lock that still lets other transactions insert rows referencing this one
pub(super) const LOCK_BY_ID: &str = "SELECT * FROM users WHERE id = $1 FOR NO KEY UPDATE";

pub async fn get(conn: &mut PgConnection, id: i32, for_update: bool) -> AppResult<Option<User>> {
    let sql = if for_update { LOCK_BY_ID } else { SELECT_BY_ID };
    let user = sqlx::query_as::<_, User>(sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn upsert(conn: &mut PgConnection, user: &User) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, profile_picture, is_admin, request_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            username = EXCLUDED.username,
            email = EXCLUDED.email,
            profile_picture = EXCLUDED.profile_picture,
            is_admin = EXCLUDED.is_admin
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.profile_picture)
    .bind(user.is_admin)
    .bind(user.request_count)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn set_request_count(conn: &mut PgConnection, user_id: i32, count: i32) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET request_count = $1 WHERE id = $2")
        .bind(count)
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
    }
    Ok(())
}
