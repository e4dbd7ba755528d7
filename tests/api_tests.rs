//! API integration tests, driven in-process against the in-memory backend

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use booklend_server::{
    api,
    config::{AppConfig, StorageBackend},
    models::UserClaims,
    repository::MemoryRepository,
    AppState,
};

const SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.backend = StorageBackend::Memory;
        config.auth.jwt_secret = SECRET.to_string();
        let state = AppState::new(config, Arc::new(MemoryRepository::new()));
        Self {
            router: api::create_router(state),
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_book(&self, admin: &str, title: &str, quantity: i32) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/books",
                Some(admin),
                Some(json!({ "title": title, "author": "Ursula K. Le Guin", "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["book_id"].as_str().unwrap().to_string()
    }

    async fn request_book(&self, member: &str, book_id: &str) -> i64 {
        let (status, body) = self
            .call(Method::POST, "/requests", Some(member), Some(json!({ "book_id": book_id })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}

fn token(user_id: i32, username: &str, is_admin: bool) -> String {
    let mut claims = UserClaims::new(user_id, username, is_admin, chrono::Duration::hours(1));
    claims.email = Some(format!("{}@example.org", username));
    claims.create_token(SECRET).unwrap()
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.call(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_catalog_writes_need_admin() {
    let app = TestApp::new();
    let admin = token(1, "librarian", true);
    let member = token(2, "alice", false);
    let payload = json!({ "title": "Dune", "author": "Frank Herbert", "quantity": 2 });

    let (status, _) = app.call(Method::POST, "/books", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::POST, "/books", Some(&member), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = app.call(Method::POST, "/books", Some("not-a-jwt"), Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let book_id = app.create_book(&admin, "The Left Hand of Darkness", 2).await;

    // Reading the catalog is public
    let (status, body) = app.call(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["total_books"], 2);

    let (status, body) = app.call(Method::GET, &format!("/books/{}", book_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_quantity"], 2);

    let (status, body) = app
        .call(Method::POST, "/books", Some(&admin), Some(json!({ "title": "", "author": "x", "quantity": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_borrow_workflow_over_http() {
    let app = TestApp::new();
    let admin = token(1, "librarian", true);
    let alice = token(2, "alice", false);
    let bob = token(3, "bob", false);

    let book_id = app.create_book(&admin, "The Dispossessed", 1).await;
    let alice_request = app.request_book(&alice, &book_id).await;
    let bob_request = app.request_book(&bob, &book_id).await;

    // Members cannot decide
    let (status, _) = app
        .call(Method::POST, &format!("/requests/{}/accept", alice_request), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::POST, &format!("/requests/{}/accept", alice_request), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["request"]["status"], "accepted");
    assert_eq!(body["book"]["available_quantity"], 0);
    let record_id = body["record"]["id"].as_i64().unwrap();

    let (status, body) = app
        .call(Method::POST, &format!("/requests/{}/accept", bob_request), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InventoryExhausted");

    let (_, body) = app
        .call(Method::GET, &format!("/requests/{}", bob_request), Some(&bob), None)
        .await;
    assert_eq!(body["status"], "rejected");

    let (status, body) = app
        .call(Method::POST, &format!("/requests/{}/reject", alice_request), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InvalidState");

    let (status, body) = app.call(Method::GET, "/notifications", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["category"], "accepted");

    let (status, _) = app
        .call(Method::DELETE, &format!("/books/{}", book_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(Method::POST, &format!("/borrowing-records/{}/return", record_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::POST, &format!("/borrowing-records/{}/return", record_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["record"]["is_returned"], true);
    assert_eq!(body["book"]["available_quantity"], 1);
    assert_eq!(body["notification"]["category"], "early");

    let (status, body) = app
        .call(Method::POST, &format!("/borrowing-records/{}/return", record_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyReturned");

    let (_, body) = app.call(Method::GET, &format!("/books/{}", book_id), None, None).await;
    assert_eq!(body["available_quantity"], 1);
}

#[tokio::test]
async fn test_listings_are_scoped_to_the_caller() {
    let app = TestApp::new();
    let admin = token(1, "librarian", true);
    let alice = token(2, "alice", false);
    let bob = token(3, "bob", false);

    let book_id = app.create_book(&admin, "Always Coming Home", 3).await;
    let first = app.request_book(&alice, &book_id).await;
    app.request_book(&alice, &book_id).await;
    app.request_book(&bob, &book_id).await;
    app.call(Method::POST, &format!("/requests/{}/accept", first), Some(&admin), None)
        .await;

    let (status, _) = app.call(Method::GET, "/requests", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::GET, "/requests?status=pending", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.call(Method::GET, "/requests/mine", Some(&alice), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) = app.call(Method::GET, "/requests/mine", Some(&bob), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::GET, &format!("/requests/{}", first), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.call(Method::GET, "/borrowing-records/mine", Some(&alice), None).await;
    assert_eq!(body["total"], 1);
    let record_id = body["records"][0]["id"].as_i64().unwrap();
    let (_, body) = app.call(Method::GET, "/borrowing-records/mine", Some(&bob), None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = app
        .call(Method::GET, &format!("/borrowing-records/{}", record_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::GET, "/borrowing-records", Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::DELETE, "/requests", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 3);

    // The loan outlives its request
    let (_, body) = app.call(Method::GET, "/borrowing-records", Some(&admin), None).await;
    assert_eq!(body["total"], 1);
    assert!(body["records"][0]["request_id"].is_null());
}

#[tokio::test]
async fn test_notifications_belong_to_their_user() {
    let app = TestApp::new();
    let admin = token(1, "librarian", true);
    let alice = token(2, "alice", false);
    let bob = token(3, "bob", false);

    let book_id = app.create_book(&admin, "The Word for World Is Forest", 1).await;
    let request = app.request_book(&alice, &book_id).await;
    app.call(Method::POST, &format!("/requests/{}/accept", request), Some(&admin), None)
        .await;

    let (_, body) = app.call(Method::GET, "/notifications", Some(&alice), None).await;
    let id = body[0]["id"].as_i64().unwrap();
    assert_eq!(body[0]["is_read"], false);

    let (status, _) = app
        .call(Method::POST, &format!("/notifications/{}/read", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::DELETE, &format!("/notifications/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::POST, &format!("/notifications/{}/read", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);

    let (status, _) = app
        .call(Method::DELETE, &format!("/notifications/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.call(Method::GET, "/notifications", Some(&alice), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_book_delete() {
    let app = TestApp::new();
    let admin = token(1, "librarian", true);
    let first = app.create_book(&admin, "Lavinia", 1).await;
    let second = app.create_book(&admin, "Tehanu", 1).await;

    let (status, _) = app
        .call(Method::DELETE, "/books", Some(&admin), Some(json!({ "book_ids": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::DELETE, "/books", Some(&admin), Some(json!({ "book_ids": [first, second] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (_, body) = app.call(Method::GET, "/books", None, None).await;
    assert_eq!(body["total"], 0);
}
