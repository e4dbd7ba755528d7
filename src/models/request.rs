//! Borrow request model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::RequestStatus;

/// A user's ask to borrow a book, awaiting an admin decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub book_id: String,
    pub status: RequestStatus,
    /// Requester's profile picture at the time the request was made
    pub profile_picture: Option<String>,
    pub request_date: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i32>,
}

/// Row to insert for a new request
#[derive(Debug, Clone)]
pub struct NewBorrowRequest {
    pub user_id: i32,
    pub book_id: String,
    pub profile_picture: Option<String>,
    pub request_date: DateTime<Utc>,
}

/// Create request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRequest {
    #[validate(length(min = 1, max = 8, message = "book_id must be 1-8 characters"))]
    pub book_id: String,
}

/// Request list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
}
