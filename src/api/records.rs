//! Borrowing record endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::record::{BorrowingRecord, RecordsList},
    policy::Operation,
    services::borrow::ReturnOutcome,
};

use super::AuthenticatedUser;

/// List all borrowing records
#[utoipa::path(
    get,
    path = "/borrowing-records",
    tag = "records",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All borrowing records", body = RecordsList),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RecordsList>> {
    claims.require(Operation::ListAllRecords)?;

    let records = state.services.borrows.list_records(None).await?;
    Ok(Json(records))
}

/// List the caller's borrowing records
#[utoipa::path(
    get,
    path = "/borrowing-records/mine",
    tag = "records",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own borrowing records", body = RecordsList)
    )
)]
pub async fn my_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RecordsList>> {
    claims.require(Operation::ListOwnRecords)?;

    let records = state.services.borrows.list_records(Some(claims.user_id)).await?;
    Ok(Json(records))
}

/// Get a borrowing record
#[utoipa::path(
    get,
    path = "/borrowing-records/{id}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Borrowing record", body = BorrowingRecord),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_record(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingRecord>> {
    claims.require(Operation::ViewRecord)?;

    let record = state.services.borrows.get_record(id, &claims).await?;
    Ok(Json(record))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowing-records/{id}/return",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnOutcome),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnOutcome>> {
    claims.require(Operation::ReturnBook)?;

    let outcome = state.services.borrows.return_book(id, &claims).await?;
    Ok(Json(outcome))
}
