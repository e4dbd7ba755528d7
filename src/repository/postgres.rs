//! PostgreSQL repository: one transaction per unit of work

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Transaction};

use super::{books, notifications, records, requests, users, Repository, UnitOfWork};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery},
        enums::RequestStatus,
        notification::{NewNotification, Notification},
        record::{BorrowingRecord, NewBorrowingRecord},
        request::{BorrowRequest, NewBorrowRequest},
        user::User,
    },
};

/// Repository backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// Open transaction; rolled back by sqlx if dropped before commit
pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already committed".to_string()))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn get_user(&mut self, id: i32) -> AppResult<Option<User>> {
        users::get(self.conn()?, id, false).await
    }

    async fn lock_user(&mut self, id: i32) -> AppResult<Option<User>> {
        users::get(self.conn()?, id, true).await
    }

    async fn upsert_user(&mut self, user: &User) -> AppResult<User> {
        users::upsert(self.conn()?, user).await
    }

    async fn set_request_count(&mut self, user_id: i32, count: i32) -> AppResult<()> {
        users::set_request_count(self.conn()?, user_id, count).await
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        books::list(self.conn()?, query).await
    }

    async fn total_quantity(&mut self) -> AppResult<i64> {
        books::total_quantity(self.conn()?).await
    }

    async fn get_book(&mut self, book_id: &str) -> AppResult<Option<Book>> {
        books::get(self.conn()?, book_id, false).await
    }

    async fn lock_book(&mut self, book_id: &str) -> AppResult<Option<Book>> {
        books::get(self.conn()?, book_id, true).await
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<Book> {
        books::insert(self.conn()?, book).await
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<Book> {
        books::update(self.conn()?, book).await
    }

    async fn delete_book(&mut self, book_id: &str) -> AppResult<bool> {
        books::delete(self.conn()?, book_id).await
    }

    async fn insert_request(&mut self, request: &NewBorrowRequest) -> AppResult<BorrowRequest> {
        requests::insert(self.conn()?, request).await
    }

    async fn get_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>> {
        requests::get(self.conn()?, id, false).await
    }

    async fn lock_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>> {
        requests::get(self.conn()?, id, true).await
    }

    async fn update_request_status(
        &mut self,
        id: i32,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
        decided_by: i32,
    ) -> AppResult<BorrowRequest> {
        requests::update_status(self.conn()?, id, status, decided_at, decided_by).await
    }

    async fn list_requests(
        &mut self,
        user_id: Option<i32>,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>> {
        requests::list(self.conn()?, user_id, status).await
    }

    async fn count_pending_requests(&mut self, book_id: &str) -> AppResult<i64> {
        requests::count_pending(self.conn()?, book_id).await
    }

    async fn delete_all_requests(&mut self) -> AppResult<Vec<BorrowRequest>> {
        requests::delete_all(self.conn()?).await
    }

    async fn insert_record(&mut self, record: &NewBorrowingRecord) -> AppResult<BorrowingRecord> {
        records::insert(self.conn()?, record).await
    }

    async fn get_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>> {
        records::get(self.conn()?, id, false).await
    }

    async fn lock_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>> {
        records::get(self.conn()?, id, true).await
    }

    async fn mark_returned(
        &mut self,
        id: i32,
        return_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord> {
        records::mark_returned(self.conn()?, id, return_date).await
    }

    async fn list_records(&mut self, user_id: Option<i32>) -> AppResult<Vec<BorrowingRecord>> {
        records::list(self.conn()?, user_id).await
    }

    async fn count_active_records(&mut self, book_id: &str) -> AppResult<i64> {
        records::count_active(self.conn()?, book_id).await
    }

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> AppResult<Notification> {
        notifications::insert(self.conn()?, notification).await
    }

    async fn list_notifications(&mut self, user_id: i32) -> AppResult<Vec<Notification>> {
        notifications::list_for_user(self.conn()?, user_id).await
    }

    async fn mark_notification_read(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Notification>> {
        notifications::mark_read(self.conn()?, id, user_id).await
    }

    async fn delete_notification(&mut self, id: i32, user_id: i32) -> AppResult<bool> {
        notifications::delete(self.conn()?, id, user_id).await
    }

    async fn commit(&mut self) -> AppResult<()> {
        match self.tx.take() {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(AppError::Internal("Transaction already committed".to_string())),
        }
    }
}
