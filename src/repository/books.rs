//! Books queries (PostgreSQL)

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery},
};

const SELECT_BY_ID: &str = "SELECT * FROM books WHERE book_id = $1";
/// Row lock that still lets other transactions insert rows referencing this one
pub(super) const LOCK_BY_ID: &str = "SELECT * FROM books WHERE book_id = $1 FOR NO KEY UPDATE";

/// List books with optional filters and pagination
pub async fn list(conn: &mut PgConnection, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
    let (limit, offset) = query.limits();

    let mut conditions = Vec::new();
    let mut idx = 1;

    let pattern = query.search.as_ref().map(|s| format!("%{}%", s));
    if pattern.is_some() {
        conditions.push(format!("(title ILIKE ${idx} OR author ILIKE ${idx})"));
        idx += 1;
    }
    if query.category.is_some() {
        conditions.push(format!("category = ${}", idx));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_q = format!("SELECT COUNT(*) FROM books {}", where_clause);
    let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
    if let Some(ref p) = pattern { count_builder = count_builder.bind(p); }
    if let Some(ref c) = query.category { count_builder = count_builder.bind(c); }
    let total = count_builder.fetch_one(&mut *conn).await?;

    let select_q = format!(
        "SELECT * FROM books {} ORDER BY title, book_id LIMIT {} OFFSET {}",
        where_clause, limit, offset
    );
    let mut builder = sqlx::query_as::<_, Book>(&select_q);
    if let Some(ref p) = pattern { builder = builder.bind(p); }
    if let Some(ref c) = query.category { builder = builder.bind(c); }
    let rows = builder.fetch_all(&mut *conn).await?;

    Ok((rows, total))
}

pub async fn total_quantity(conn: &mut PgConnection) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM books")
        .fetch_one(conn)
        .await?;
    Ok(total)
}

pub async fn get(conn: &mut PgConnection, book_id: &str, for_update: bool) -> AppResult<Option<Book>> {
    let sql = if for_update { LOCK_BY_ID } else { SELECT_BY_ID };
    let book = sqlx::query_as::<_, Book>(sql)
        .bind(book_id)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

pub async fn insert(conn: &mut PgConnection, book: &Book) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (
            book_id, title, author, publication_year, publisher,
            category, location, quantity, available_quantity, date_added
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&book.book_id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.publication_year)
    .bind(&book.publisher)
    .bind(&book.category)
    .bind(&book.location)
    .bind(book.quantity)
    .bind(book.available_quantity)
    .bind(book.date_added)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict(format!("Book {} already exists", book.book_id))
        }
        other => AppError::Database(other),
    })
}

pub async fn update(conn: &mut PgConnection, book: &Book) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        r#"
        UPDATE books SET
            title = $2, author = $3, publication_year = $4, publisher = $5,
            category = $6, location = $7, quantity = $8, available_quantity = $9
        WHERE book_id = $1
        RETURNING *
        "#,
    )
    .bind(&book.book_id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.publication_year)
    .bind(&book.publisher)
    .bind(&book.category)
    .bind(&book.location)
    .bind(book.quantity)
    .bind(book.available_quantity)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book.book_id)))
}

pub async fn delete(conn: &mut PgConnection, book_id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
        .bind(book_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
