//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::request::{BorrowRequest, CreateBorrowRequest, RequestQuery},
    policy::Operation,
    services::borrow::AcceptOutcome,
};

use super::{books::DeletedResponse, AuthenticatedUser};

/// Ask to borrow a book
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request filed", body = BorrowRequest),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    claims.require(Operation::CreateRequest)?;
    body.validate()?;

    let request = state.services.borrows.create_request(&claims, &body.book_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List all borrow requests
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Borrow requests, newest first", body = Vec<BorrowRequest>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require(Operation::ListAllRequests)?;

    let requests = state.services.borrows.list_requests(None, query.status).await?;
    Ok(Json(requests))
}

/// List the caller's borrow requests
#[utoipa::path(
    get,
    path = "/requests/mine",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Own borrow requests", body = Vec<BorrowRequest>)
    )
)]
pub async fn my_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require(Operation::ListOwnRequests)?;

    let requests = state
        .services
        .borrows
        .list_requests(Some(claims.user_id), query.status)
        .await?;
    Ok(Json(requests))
}

/// Get a borrow request
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require(Operation::ViewRequest)?;

    let request = state.services.borrows.get_request(id, &claims).await?;
    Ok(Json(request))
}

/// Accept a pending request and lend the book
#[utoipa::path(
    post,
    path = "/requests/{id}/accept",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request accepted, loan started", body = AcceptOutcome),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided"),
        (status = 422, description = "No copy available; request rejected")
    )
)]
pub async fn accept_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AcceptOutcome>> {
    claims.require(Operation::AcceptRequest)?;

    let outcome = state.services.borrows.accept_request(id, &claims).await?;
    Ok(Json(outcome))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    )
)]
pub async fn reject_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require(Operation::RejectRequest)?;

    let request = state.services.borrows.reject_request(id, &claims).await?;
    Ok(Json(request))
}

/// Delete every borrow request
#[utoipa::path(
    delete,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Requests deleted", body = DeletedResponse),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn delete_all_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DeletedResponse>> {
    claims.require(Operation::DeleteAllRequests)?;

    let deleted = state.services.borrows.delete_all_requests(&claims).await?;
    Ok(Json(DeletedResponse { deleted }))
}
