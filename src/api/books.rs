//! Book (inventory) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::book::{Book, BookIds, BookQuery, CreateBook, UpdateBook},
    policy::Operation,
    services::catalog::BookList,
};

use super::AuthenticatedUser;

/// Bulk delete result
#[derive(Serialize, ToSchema)]
pub struct DeletedResponse {
    /// Number of rows removed
    pub deleted: u64,
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books and catalog totals", body = BookList)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<BookList>> {
    Operation::ListBooks.authorize_anonymous()?;
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get a book by identifier
#[utoipa::path(
    get,
    path = "/books/{book_id}",
    tag = "books",
    params(
        ("book_id" = String, Path, description = "Book identifier")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(book_id): Path<String>,
) -> AppResult<Json<Book>> {
    Operation::ViewBook.authorize_anonymous()?;
    let book = state.services.catalog.get_book(&book_id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require(Operation::CreateBook)?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{book_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = String, Path, description = "Book identifier")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Quantity lower than copies on loan"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<String>,
    Json(update): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require(Operation::UpdateBook)?;

    let book = state.services.catalog.update_book(&book_id, update).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{book_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = String, Path, description = "Book identifier")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies still on loan")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require(Operation::DeleteBook)?;

    state.services.catalog.delete_book(&book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several books
#[utoipa::path(
    delete,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookIds,
    responses(
        (status = 200, description = "Books deleted", body = DeletedResponse),
        (status = 400, description = "No book ids given"),
        (status = 409, description = "A book still has copies on loan")
    )
)]
pub async fn delete_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<BookIds>,
) -> AppResult<Json<DeletedResponse>> {
    claims.require(Operation::DeleteBooks)?;

    let deleted = state.services.catalog.delete_books(&body.book_ids).await?;
    Ok(Json(DeletedResponse { deleted }))
}
