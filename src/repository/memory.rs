//! In-memory repository
//!
//! Units of work are serialized behind a single async mutex. Each one edits a
//! copy of the store and publishes it on commit, so an abandoned unit of work
//! leaves no trace. Used by the `memory` storage backend and by tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Repository, UnitOfWork};
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

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: BTreeMap<i32, User>,
    books: BTreeMap<String, Book>,
    requests: BTreeMap<i32, BorrowRequest>,
    records: BTreeMap<i32, BorrowingRecord>,
    notifications: BTreeMap<i32, Notification>,
    last_request_id: i32,
    last_record_id: i32,
    last_notification_id: i32,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryRepository {
    /// Every stored user, read outside any unit of work
    pub(crate) async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.values().cloned().collect()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            working,
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
}

impl MemoryUnitOfWork {
    fn state(&mut self) -> AppResult<&mut MemoryState> {
        if self.guard.is_none() {
            return Err(AppError::Internal("Unit of work already committed".to_string()));
        }
        Ok(&mut self.working)
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn get_user(&mut self, id: i32) -> AppResult<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: i32) -> AppResult<Option<User>> {
        self.get_user(id).await
    }

    async fn upsert_user(&mut self, user: &User) -> AppResult<User> {
        let state = self.state()?;
        let stored = match state.users.get(&user.id) {
            Some(existing) => User {
                request_count: existing.request_count,
                ..user.clone()
            },
            None => user.clone(),
        };
        state.users.insert(user.id, stored.clone());
        Ok(stored)
    }

    async fn set_request_count(&mut self, user_id: i32, count: i32) -> AppResult<()> {
        let user = self
            .state()?
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        user.request_count = count;
        Ok(())
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = query.limits();
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut matches: Vec<Book> = self
            .state()?
            .books
            .values()
            .filter(|b| match &search {
                Some(s) => b.title.to_lowercase().contains(s) || b.author.to_lowercase().contains(s),
                None => true,
            })
            .filter(|b| match &query.category {
                Some(c) => b.category.as_deref() == Some(c.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| (&a.title, &a.book_id).cmp(&(&b.title, &b.book_id)));

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn total_quantity(&mut self) -> AppResult<i64> {
        Ok(self.state()?.books.values().map(|b| b.quantity as i64).sum())
    }

    async fn get_book(&mut self, book_id: &str) -> AppResult<Option<Book>> {
        Ok(self.state()?.books.get(book_id).cloned())
    }

    async fn lock_book(&mut self, book_id: &str) -> AppResult<Option<Book>> {
        self.get_book(book_id).await
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<Book> {
        let state = self.state()?;
        if state.books.contains_key(&book.book_id) {
            return Err(AppError::Conflict(format!("Book {} already exists", book.book_id)));
        }
        state.books.insert(book.book_id.clone(), book.clone());
        Ok(book.clone())
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<Book> {
        let stored = self
            .state()?
            .books
            .get_mut(&book.book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book.book_id)))?;
        // date_added is not updatable
        *stored = Book {
            date_added: stored.date_added,
            ..book.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_book(&mut self, book_id: &str) -> AppResult<bool> {
        let state = self.state()?;
        let removed = state.books.remove(book_id).is_some();
        if removed {
            state.requests.retain(|_, r| r.book_id != book_id);
            state.records.retain(|_, r| r.book_id != book_id);
        }
        Ok(removed)
    }

    async fn insert_request(&mut self, request: &NewBorrowRequest) -> AppResult<BorrowRequest> {
        let state = self.state()?;
        state.last_request_id += 1;
        let row = BorrowRequest {
            id: state.last_request_id,
            user_id: request.user_id,
            book_id: request.book_id.clone(),
            status: RequestStatus::Pending,
            profile_picture: request.profile_picture.clone(),
            request_date: request.request_date,
            decided_at: None,
            decided_by: None,
        };
        state.requests.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>> {
        Ok(self.state()?.requests.get(&id).cloned())
    }

    async fn lock_request(&mut self, id: i32) -> AppResult<Option<BorrowRequest>> {
        self.get_request(id).await
    }

    async fn update_request_status(
        &mut self,
        id: i32,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
        decided_by: i32,
    ) -> AppResult<BorrowRequest> {
        let request = self
            .state()?
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;
        request.status = status;
        request.decided_at = Some(decided_at);
        request.decided_by = Some(decided_by);
        Ok(request.clone())
    }

    async fn list_requests(
        &mut self,
        user_id: Option<i32>,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>> {
        let mut rows: Vec<BorrowRequest> = self
            .state()?
            .requests
            .values()
            .filter(|r| user_id.map_or(true, |u| r.user_id == u))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.request_date, r.id));
        Ok(rows)
    }

    async fn count_pending_requests(&mut self, book_id: &str) -> AppResult<i64> {
        Ok(self
            .state()?
            .requests
            .values()
            .filter(|r| r.book_id == book_id && r.status == RequestStatus::Pending)
            .count() as i64)
    }

    async fn delete_all_requests(&mut self) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state()?;
        let removed = std::mem::take(&mut state.requests).into_values().collect();
        for record in state.records.values_mut() {
            record.request_id = None;
        }
        Ok(removed)
    }

    async fn insert_record(&mut self, record: &NewBorrowingRecord) -> AppResult<BorrowingRecord> {
        let state = self.state()?;
        state.last_record_id += 1;
        let row = BorrowingRecord {
            id: state.last_record_id,
            user_id: record.user_id,
            book_id: record.book_id.clone(),
            request_id: record.request_id,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: None,
            is_returned: false,
        };
        state.records.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>> {
        Ok(self.state()?.records.get(&id).cloned())
    }

    async fn lock_record(&mut self, id: i32) -> AppResult<Option<BorrowingRecord>> {
        self.get_record(id).await
    }

    async fn mark_returned(
        &mut self,
        id: i32,
        return_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord> {
        let record = self
            .state()?
            .records
            .get_mut(&id)
            .filter(|r| !r.is_returned)
            .ok_or_else(|| AppError::AlreadyReturned(format!("Borrowing record {} already returned", id)))?;
        record.return_date = Some(return_date);
        record.is_returned = true;
        Ok(record.clone())
    }

    async fn list_records(&mut self, user_id: Option<i32>) -> AppResult<Vec<BorrowingRecord>> {
        let mut rows: Vec<BorrowingRecord> = self
            .state()?
            .records
            .values()
            .filter(|r| user_id.map_or(true, |u| r.user_id == u))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.borrow_date, r.id));
        Ok(rows)
    }

    async fn count_active_records(&mut self, book_id: &str) -> AppResult<i64> {
        Ok(self
            .state()?
            .records
            .values()
            .filter(|r| r.book_id == book_id && r.is_active())
            .count() as i64)
    }

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> AppResult<Notification> {
        let state = self.state()?;
        state.last_notification_id += 1;
        let row = Notification {
            id: state.last_notification_id,
            user_id: notification.user_id,
            message: notification.message.clone(),
            category: notification.category,
            is_read: false,
            created_at: notification.created_at,
        };
        state.notifications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_notifications(&mut self, user_id: i32) -> AppResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .state()?
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |n| (n.created_at, n.id));
        Ok(rows)
    }

    async fn mark_notification_read(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .state()?
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    async fn delete_notification(&mut self, id: i32, user_id: i32) -> AppResult<bool> {
        let state = self.state()?;
        match state.notifications.get(&id) {
            Some(n) if n.user_id == user_id => {
                state.notifications.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| AppError::Internal("Unit of work already committed".to_string()))?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
