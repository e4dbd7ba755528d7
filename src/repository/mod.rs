//! Repository layer for database operations
//!
//! Services talk to storage through a [`UnitOfWork`]: a set of reads and writes
//! that becomes visible all at once on [`UnitOfWork::commit`]. Dropping a unit
//! of work without committing discards every write made through it.
//!
//! The `lock_*` readers take the row for the rest of the unit of work
//! (`SELECT ... FOR NO KEY UPDATE` on PostgreSQL), so check-then-write sequences such
//! as "is a copy available? then decrement it" cannot interleave.

pub mod books;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod records;
pub mod requests;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery},
        enums::RequestStatus,
        notification::{NewNotification, Notification},
        record::{BorrowingRecord, NewBorrowingRecord},
        request::{BorrowRequest, NewBorrowRequest},
        user::User,
    },
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Entry point to storage
#[async_trait]
pub trait Repository: Send + Sync {
    /// Start a new unit of work
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    // Users

    async fn get_user(&mut self, id: i32) -> AppResult<Option<User>>;
    async fn lock_user(&mut self, id: i32) -> AppResult<Option<User>>;
    /// Insert the user, or refresh its profile fields keeping the stored `request_count`
    async fn upsert_user(&mut self, user: &User) -> AppResult<User>;
    async fn set_request_count(&mut self, user_id: i32, count: i32) -> AppResult<()>;

    // Books

    /// Page of books matching the query, with the total number of matches
    async fn list_books(&mut self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    /// Sum of owned copies over the whole catalog
    async fn total_quantity(&mut self) -> AppResult<i64>;
    async fn get_book(&mut self, book_id: &str) -> AppResult<Option<Book>>;
    async fn lock_book(&mut self, book_id: &str) -> AppResult<Option<Book>>;
    async fn insert_book(&mut self, book: &Book) -> AppResult<Book>;
    /// Overwrite every column of an existing book
    async fn update_book(&mut self, book: &Book) -> AppResult<Book>;
    async fn delete_book(&mut self, book_id: &str) -> AppResult<bool>;

    // Borrow requests

    async fn insert_request(&mut self, request: &NewBorrowRequest) -> AppResult<BorrowRequest>;
    async fn get_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>>;
    async fn lock_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>>;
    async fn update_request_status(
        &mut self,
        id: i32,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
        decided_by: i32,
    ) -> AppResult<BorrowRequest>;
    /// Requests, newest first, optionally restricted to one user and/or status
    async fn list_requests(
        &mut self,
        user_id: Option<i32>,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>>;
    /// Pending requests for a book
    async fn count_pending_requests(&mut self, book_id: &str) -> AppResult<i64>;
    /// Delete every request, returning the rows as they were when removed
    async fn delete_all_requests(&mut self) -> AppResult<Vec<BorrowRequest>>;

    // Borrowing records

    async fn insert_record(&mut self, record: &NewBorrowingRecord) -> AppResult<BorrowingRecord>;
    async fn get_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>>;
    async fn lock_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>>;
    async fn mark_returned(
        &mut self,
        id: i32,
        return_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord>;
    /// Records, newest first, optionally restricted to one user
    async fn list_records(&mut self, user_id: Option<i32>) -> AppResult<Vec<BorrowingRecord>>;
    /// Unreturned records for a book
    async fn count_active_records(&mut self, book_id: &str) -> AppResult<i64>;

    // Notifications

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> AppResult<Notification>;
    async fn list_notifications(&mut self, user_id: i32) -> AppResult<Vec<Notification>>;
    /// Returns `None` when no notification with this id belongs to the user
    async fn mark_notification_read(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Notification>>;
    async fn delete_notification(&mut self, id: i32, user_id: i32) -> AppResult<bool>;

    /// Make every write of this unit of work visible
    async fn commit(&mut self) -> AppResult<()>;
}
