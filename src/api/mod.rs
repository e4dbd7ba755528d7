//! API handlers for Booklend REST endpoints

pub mod books;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod records;
pub mod requests;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books (inventory)
        .route(
            "/books",
            get(books::list_books)
                .post(books::create_book)
                .delete(books::delete_books),
        )
        .route(
            "/books/:book_id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrow requests
        .route(
            "/requests",
            get(requests::list_requests)
                .post(requests::create_request)
                .delete(requests::delete_all_requests),
        )
        .route("/requests/mine", get(requests::my_requests))
        .route("/requests/:id", get(requests::get_request))
        .route("/requests/:id/accept", post(requests::accept_request))
        .route("/requests/:id/reject", post(requests::reject_request))
        // Borrowing records
        .route("/borrowing-records", get(records::list_records))
        .route("/borrowing-records/mine", get(records::my_records))
        .route("/borrowing-records/:id", get(records::get_record))
        .route("/borrowing-records/:id/return", post(records::return_book))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/notifications/:id", delete(notifications::delete_notification))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
