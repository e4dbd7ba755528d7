//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, notifications, records, requests};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Booklend API",
        version = "0.3.0",
        description = "Library lending REST API: catalog, borrow requests, loans and notifications"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::delete_books,
        // Requests
        requests::create_request,
        requests::list_requests,
        requests::my_requests,
        requests::get_request,
        requests::accept_request,
        requests::reject_request,
        requests::delete_all_requests,
        // Records
        records::list_records,
        records::my_records,
        records::get_record,
        records::return_book,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        notifications::delete_notification,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookQuery,
            crate::models::book::BookIds,
            crate::services::catalog::BookList,
            books::DeletedResponse,
            // Requests
            crate::models::request::BorrowRequest,
            crate::models::request::CreateBorrowRequest,
            crate::models::request::RequestQuery,
            crate::models::enums::RequestStatus,
            crate::services::borrow::AcceptOutcome,
            // Records
            crate::models::record::BorrowingRecord,
            crate::models::record::RecordsList,
            crate::services::borrow::ReturnOutcome,
            // Notifications
            crate::models::notification::Notification,
            crate::models::enums::NotificationCategory,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog and inventory"),
        (name = "requests", description = "Borrow request workflow"),
        (name = "records", description = "Loans and returns"),
        (name = "notifications", description = "In-app notifications")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
