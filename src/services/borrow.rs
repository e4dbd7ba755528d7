//! Borrow workflow: request → accept/reject → loan → return
//!
//! Every operation runs in a single unit of work. The request (or record) row
//! is locked first, then the book, then the requester, so concurrent accepts
//! on the last copy serialize on the book row and only one can decrement it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        enums::{NotificationCategory, RequestStatus},
        notification::{NewNotification, Notification},
        record::{BorrowingRecord, NewBorrowingRecord, RecordsList, ReturnTiming},
        request::{BorrowRequest, NewBorrowRequest},
        user::UserClaims,
    },
    repository::{Repository, UnitOfWork},
};

/// Result of a successful acceptance
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcceptOutcome {
    pub request: BorrowRequest,
    pub record: BorrowingRecord,
    pub book: Book,
    pub notification: Notification,
}

/// Result of a successful return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub record: BorrowingRecord,
    pub book: Book,
    pub notification: Notification,
}

#[derive(Clone)]
pub struct BorrowService {
    repository: Arc<dyn Repository>,
    loan_period: Duration,
}

impl BorrowService {
    pub fn new(repository: Arc<dyn Repository>, loan_period_days: i64) -> Self {
        Self {
            repository,
            loan_period: Duration::days(loan_period_days),
        }
    }

    /// File a pending request for a book on behalf of the principal
    pub async fn create_request(&self, principal: &UserClaims, book_id: &str) -> AppResult<BorrowRequest> {
        self.create_request_at(principal, book_id, Utc::now()).await
    }

    pub(crate) async fn create_request_at(
        &self,
        principal: &UserClaims,
        book_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowRequest> {
        let mut uow = self.repository.begin().await?;

        // Book before user, the order every other workflow operation locks in.
        uow.lock_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        // The upsert holds the user row until commit, so the counter bump below cannot race.
        let user = uow.upsert_user(&principal.to_user(0)).await?;
        uow.set_request_count(user.id, user.request_count + 1).await?;

        let request = uow
            .insert_request(&NewBorrowRequest {
                user_id: user.id,
                book_id: book_id.to_string(),
                profile_picture: user.profile_picture.clone(),
                request_date: now,
            })
            .await?;

        uow.commit().await?;

        tracing::info!(
            request_id = request.id,
            book_id = %request.book_id,
            user_id = request.user_id,
            "Borrow request created"
        );
        Ok(request)
    }

    /// Grant a pending request: one copy leaves the shelf and a loan starts
    ///
    /// With no copy left the request is rejected instead and
    /// [`AppError::InventoryExhausted`] is returned.
    pub async fn accept_request(&self, request_id: i32, actor: &UserClaims) -> AppResult<AcceptOutcome> {
        self.accept_request_at(request_id, actor, Utc::now()).await
    }

    pub(crate) async fn accept_request_at(
        &self,
        request_id: i32,
        actor: &UserClaims,
        now: DateTime<Utc>,
    ) -> AppResult<AcceptOutcome> {
        let mut uow = self.repository.begin().await?;

        let request = lock_pending_request(uow.as_mut(), request_id, RequestStatus::Accepted).await?;
        let book = uow
            .lock_book(&request.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", request.book_id)))?;

        if book.available_quantity <= 0 {
            uow.update_request_status(request_id, RequestStatus::Rejected, now, actor.user_id)
                .await?;
            release_request_slot(uow.as_mut(), request.user_id, 1).await?;
            uow.commit().await?;

            tracing::warn!(
                request_id,
                book_id = %book.book_id,
                "Borrow request rejected: no copies available"
            );
            return Err(AppError::InventoryExhausted(format!(
                "No copies of '{}' are available; request {} was rejected",
                book.title, request_id
            )));
        }

        let request = uow
            .update_request_status(request_id, RequestStatus::Accepted, now, actor.user_id)
            .await?;
        let book = uow
            .update_book(&Book {
                available_quantity: book.available_quantity - 1,
                ..book
            })
            .await?;

        let due_date = now + self.loan_period;
        let record = uow
            .insert_record(&NewBorrowingRecord {
                user_id: request.user_id,
                book_id: book.book_id.clone(),
                request_id: Some(request.id),
                borrow_date: now,
                due_date,
            })
            .await?;

        let notification = uow
            .insert_notification(&NewNotification {
                user_id: request.user_id,
                message: format!(
                    "Your request to borrow '{}' has been accepted. Please return it by {}.",
                    book.title,
                    due_date.format("%Y-%m-%d")
                ),
                category: NotificationCategory::Accepted,
                created_at: now,
            })
            .await?;

        uow.commit().await?;

        tracing::info!(
            request_id,
            record_id = record.id,
            book_id = %book.book_id,
            user_id = request.user_id,
            available = book.available_quantity,
            "Borrow request accepted"
        );
        Ok(AcceptOutcome {
            request,
            record,
            book,
            notification,
        })
    }

    /// Decline a pending request; inventory is untouched
    pub async fn reject_request(&self, request_id: i32, actor: &UserClaims) -> AppResult<BorrowRequest> {
        let now = Utc::now();
        let mut uow = self.repository.begin().await?;

        let request = lock_pending_request(uow.as_mut(), request_id, RequestStatus::Rejected).await?;
        let request = uow
            .update_request_status(request_id, RequestStatus::Rejected, now, actor.user_id)
            .await?;
        release_request_slot(uow.as_mut(), request.user_id, 1).await?;

        uow.commit().await?;

        tracing::info!(request_id, user_id = request.user_id, "Borrow request rejected");
        Ok(request)
    }

    /// Close a loan: the copy goes back on the shelf and the borrower is told how the return compares to the due date
    pub async fn return_book(&self, record_id: i32, actor: &UserClaims) -> AppResult<ReturnOutcome> {
        self.return_book_at(record_id, actor, Utc::now()).await
    }

    pub(crate) async fn return_book_at(
        &self,
        record_id: i32,
        actor: &UserClaims,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        let mut uow = self.repository.begin().await?;

        let record = uow
            .lock_record(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))?;

        if !actor.is_admin && record.user_id != actor.user_id {
            return Err(AppError::Authorization(
                "Only the borrower or an administrator can return this book".to_string(),
            ));
        }
        if record.is_returned {
            return Err(AppError::AlreadyReturned(format!(
                "Borrowing record {} already returned",
                record_id
            )));
        }

        let record = uow.mark_returned(record_id, now).await?;

        let book = uow
            .lock_book(&record.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", record.book_id)))?;
        let book = uow
            .update_book(&Book {
                available_quantity: (book.available_quantity + 1).min(book.quantity),
                ..book
            })
            .await?;

        let timing = ReturnTiming::between(record.due_date, now);
        let notification = uow
            .insert_notification(&NewNotification {
                user_id: record.user_id,
                message: timing.describe(&book.title),
                category: timing.category(),
                created_at: now,
            })
            .await?;

        release_request_slot(uow.as_mut(), record.user_id, 1).await?;

        uow.commit().await?;

        tracing::info!(
            record_id,
            book_id = %book.book_id,
            user_id = record.user_id,
            timing = ?timing,
            "Book returned"
        );
        Ok(ReturnOutcome {
            record,
            book,
            notification,
        })
    }

    /// Remove every borrow request; loans keep existing without their request link
    pub async fn delete_all_requests(&self, actor: &UserClaims) -> AppResult<u64> {
        let mut uow = self.repository.begin().await?;

        // Request rows go first so users are locked last, as in every other operation.
        let removed = uow.delete_all_requests().await?;

        let mut pending_per_user: BTreeMap<i32, i32> = BTreeMap::new();
        for request in removed.iter().filter(|r| r.status == RequestStatus::Pending) {
            *pending_per_user.entry(request.user_id).or_default() += 1;
        }
        for (user_id, pending) in pending_per_user {
            release_request_slot(uow.as_mut(), user_id, pending).await?;
        }
        uow.commit().await?;

        let deleted = removed.len() as u64;

        tracing::info!(deleted, admin_id = actor.user_id, "All borrow requests deleted");
        Ok(deleted)
    }

    pub async fn list_requests(
        &self,
        user_id: Option<i32>,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>> {
        let mut uow = self.repository.begin().await?;
        uow.list_requests(user_id, status).await
    }

    /// Get a request visible to the principal
    pub async fn get_request(&self, request_id: i32, principal: &UserClaims) -> AppResult<BorrowRequest> {
        let mut uow = self.repository.begin().await?;
        uow.get_request(request_id)
            .await?
            .filter(|r| principal.is_admin || r.user_id == principal.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", request_id)))
    }

    pub async fn list_records(&self, user_id: Option<i32>) -> AppResult<RecordsList> {
        let mut uow = self.repository.begin().await?;
        let records = uow.list_records(user_id).await?;
        Ok(RecordsList {
            total: records.len() as i64,
            records,
        })
    }

    /// Get a borrowing record visible to the principal
    pub async fn get_record(&self, record_id: i32, principal: &UserClaims) -> AppResult<BorrowingRecord> {
        let mut uow = self.repository.begin().await?;
        uow.get_record(record_id)
            .await?
            .filter(|r| principal.is_admin || r.user_id == principal.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))
    }
}

/// Lock a request and make sure it may move to `next`
async fn lock_pending_request(
    uow: &mut dyn UnitOfWork,
    request_id: i32,
    next: RequestStatus,
) -> AppResult<BorrowRequest> {
    let request = uow
        .lock_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", request_id)))?;

    if !request.status.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "Borrow request {} is already {} and cannot become {}",
            request_id, request.status, next
        )));
    }
    Ok(request)
}

/// Lower the advisory counter of a user, never below zero
async fn release_request_slot(uow: &mut dyn UnitOfWork, user_id: i32, slots: i32) -> AppResult<()> {
    if let Some(user) = uow.lock_user(user_id).await? {
        if user.request_count > 0 {
            uow.set_request_count(user_id, (user.request_count - slots).max(0))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::services::test_support::assert_consistent;
    use chrono::{NaiveDate, TimeZone};

    struct Fixture {
        repo: MemoryRepository,
        service: BorrowService,
        admin: UserClaims,
    }

    fn member(id: i32, name: &str) -> UserClaims {
        let mut claims = UserClaims::new(id, name, false, Duration::hours(1));
        claims.profile_picture = Some(format!("avatars/{}.png", name));
        claims
    }

    async fn fixture(books: &[(&str, i32)]) -> Fixture {
        let repo = MemoryRepository::new();
        let mut uow = repo.begin().await.unwrap();
        for (id, quantity) in books {
            uow.insert_book(&Book {
                book_id: id.to_string(),
                title: format!("Title of {}", id),
                author: "Octavia Butler".to_string(),
                publication_year: Some(1993),
                publisher: None,
                category: None,
                location: None,
                quantity: *quantity,
                available_quantity: *quantity,
                date_added: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            })
            .await
            .unwrap();
        }
        uow.commit().await.unwrap();

        let service = BorrowService::new(Arc::new(repo.clone()), 10);
        let admin = UserClaims::new(100, "librarian", true, Duration::hours(1));
        Fixture { repo, service, admin }
    }

    async fn book(repo: &MemoryRepository, id: &str) -> Book {
        let mut uow = repo.begin().await.unwrap();
        uow.get_book(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_accept_creates_loan_and_notification() {
        let f = fixture(&[("BK250001", 2)]).await;
        let alice = member(1, "alice");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.profile_picture.as_deref(), Some("avatars/alice.png"));
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 2);

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let outcome = f.service.accept_request_at(request.id, &f.admin, now).await.unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Accepted);
        assert_eq!(outcome.request.decided_by, Some(100));
        assert_eq!(outcome.book.available_quantity, 1);
        assert_eq!(outcome.record.borrow_date, now);
        assert_eq!(outcome.record.due_date, now + Duration::days(10));
        assert!(!outcome.record.is_returned);
        assert_eq!(outcome.record.request_id, Some(request.id));
        assert_eq!(outcome.notification.user_id, 1);
        assert_eq!(outcome.notification.category, NotificationCategory::Accepted);
        assert!(outcome.notification.message.contains("2025-06-11"));

        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 1);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_accept_without_copies_rejects_request() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let bob = member(2, "bob");
        let first = f.service.create_request(&alice, "BK250001").await.unwrap();
        let second = f.service.create_request(&bob, "BK250001").await.unwrap();
        f.service.accept_request(first.id, &f.admin).await.unwrap();

        let err = f.service.accept_request(second.id, &f.admin).await.unwrap_err();
        assert!(matches!(err, AppError::InventoryExhausted(_)));

        let stored = f.service.get_request(second.id, &f.admin).await.unwrap();
        assert_eq!(stored.status, RequestStatus::Rejected);
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 0);

        let bob_records = f.service.list_records(Some(2)).await.unwrap();
        assert_eq!(bob_records.total, 0);
        let mut uow = f.repo.begin().await.unwrap();
        assert!(uow.list_notifications(2).await.unwrap().is_empty());
        drop(uow);

        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_decided_requests_cannot_transition_again() {
        let f = fixture(&[("BK250001", 3)]).await;
        let alice = member(1, "alice");
        let accepted = f.service.create_request(&alice, "BK250001").await.unwrap();
        let rejected = f.service.create_request(&alice, "BK250001").await.unwrap();
        f.service.accept_request(accepted.id, &f.admin).await.unwrap();
        f.service.reject_request(rejected.id, &f.admin).await.unwrap();

        for id in [accepted.id, rejected.id] {
            assert!(matches!(
                f.service.accept_request(id, &f.admin).await,
                Err(AppError::InvalidStateTransition(_))
            ));
            assert!(matches!(
                f.service.reject_request(id, &f.admin).await,
                Err(AppError::InvalidStateTransition(_))
            ));
        }

        // Exactly one copy out: the failed transitions had no side effects.
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 2);
        assert_eq!(f.service.list_records(None).await.unwrap().total, 1);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        assert!(matches!(
            f.service.create_request(&alice, "BK999999").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.accept_request(42, &f.admin).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.reject_request(42, &f.admin).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.return_book(42, &f.admin).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reject_has_no_inventory_effect() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();

        let rejected = f.service.reject_request(request.id, &f.admin).await.unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert!(rejected.decided_at.is_some());
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 1);
        assert_eq!(f.service.list_records(None).await.unwrap().total, 0);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_return_twice_increments_once() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();
        let loan = f.service.accept_request(request.id, &f.admin).await.unwrap();
        assert_eq!(loan.book.available_quantity, 0);

        let outcome = f.service.return_book(loan.record.id, &alice).await.unwrap();
        assert!(outcome.record.is_returned);
        assert!(outcome.record.return_date.is_some());
        assert_eq!(outcome.book.available_quantity, 1);

        let err = f.service.return_book(loan.record.id, &alice).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(_)));
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 1);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_only_borrower_or_admin_can_return() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let mallory = member(3, "mallory");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();
        let loan = f.service.accept_request(request.id, &f.admin).await.unwrap();

        assert!(matches!(
            f.service.return_book(loan.record.id, &mallory).await,
            Err(AppError::Authorization(_))
        ));
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 0);

        f.service.return_book(loan.record.id, &f.admin).await.unwrap();
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 1);
    }

    #[tokio::test]
    async fn test_return_notification_describes_timing() {
        let f = fixture(&[("BK250001", 3)]).await;
        let alice = member(1, "alice");
        let borrowed = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let due = borrowed + Duration::days(10);

        let mut loans = Vec::new();
        for _ in 0..3 {
            let request = f.service.create_request(&alice, "BK250001").await.unwrap();
            let outcome = f.service.accept_request_at(request.id, &f.admin, borrowed).await.unwrap();
            assert_eq!(outcome.record.due_date, due);
            loans.push(outcome.record.id);
        }

        let late = f.service.return_book_at(loans[0], &alice, due + Duration::days(3)).await.unwrap();
        assert!(late.notification.message.contains("3 days overdue"), "{}", late.notification.message);
        assert_eq!(late.notification.category, NotificationCategory::Overdue);

        let early = f.service.return_book_at(loans[1], &alice, due - Duration::days(2)).await.unwrap();
        assert!(early.notification.message.contains("2 days in advance"));
        assert_eq!(early.notification.category, NotificationCategory::Early);

        let on_time = f.service.return_book_at(loans[2], &alice, due).await.unwrap();
        assert!(on_time.notification.message.contains("on the due date"));
        assert_eq!(on_time.notification.category, NotificationCategory::OnTime);

        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 3);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test]
    async fn test_request_counter_tracks_pending_and_active() {
        let f = fixture(&[("BK250001", 2), ("BK250002", 1)]).await;
        let alice = member(1, "alice");

        let r1 = f.service.create_request(&alice, "BK250001").await.unwrap();
        let r2 = f.service.create_request(&alice, "BK250002").await.unwrap();
        let _pending = f.service.create_request(&alice, "BK250001").await.unwrap();
        assert_consistent(&f.repo).await;

        let loan = f.service.accept_request(r1.id, &f.admin).await.unwrap();
        f.service.reject_request(r2.id, &f.admin).await.unwrap();
        assert_consistent(&f.repo).await;

        f.service.return_book(loan.record.id, &alice).await.unwrap();
        assert_consistent(&f.repo).await;

        let mut uow = f.repo.begin().await.unwrap();
        assert_eq!(uow.get_user(1).await.unwrap().unwrap().request_count, 1);
        drop(uow);

        let deleted = f.service.delete_all_requests(&f.admin).await.unwrap();
        assert_eq!(deleted, 3);
        assert!(f.service.list_requests(None, None).await.unwrap().is_empty());

        let mut uow = f.repo.begin().await.unwrap();
        assert_eq!(uow.get_user(1).await.unwrap().unwrap().request_count, 0);
        let records = uow.list_records(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_id, None);
    }

    #[tokio::test]
    async fn test_requests_are_private_to_their_owner() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let bob = member(2, "bob");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();

        assert!(f.service.get_request(request.id, &alice).await.is_ok());
        assert!(f.service.get_request(request.id, &f.admin).await.is_ok());
        assert!(matches!(
            f.service.get_request(request.id, &bob).await,
            Err(AppError::NotFound(_))
        ));

        let pending = f.service.list_requests(None, Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(f.service.list_requests(Some(2), None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts_on_last_copy() {
        let f = fixture(&[("BK250001", 1)]).await;
        let first = f.service.create_request(&member(1, "alice"), "BK250001").await.unwrap();
        let second = f.service.create_request(&member(2, "bob"), "BK250001").await.unwrap();

        let handles: Vec<_> = [first.id, second.id]
            .into_iter()
            .map(|id| {
                let service = f.service.clone();
                let admin = f.admin.clone();
                tokio::spawn(async move { service.accept_request(id, &admin).await })
            })
            .collect();

        let mut accepted = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::InventoryExhausted(_)) => exhausted += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!((accepted, exhausted), (1, 1));
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 0);
        assert_eq!(f.service.list_records(None).await.unwrap().total, 1);
        assert_consistent(&f.repo).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_returns_succeed_once() {
        let f = fixture(&[("BK250001", 1)]).await;
        let alice = member(1, "alice");
        let request = f.service.create_request(&alice, "BK250001").await.unwrap();
        let loan = f.service.accept_request(request.id, &f.admin).await.unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = f.service.clone();
                let alice = alice.clone();
                let id = loan.record.id;
                tokio::spawn(async move { service.return_book(id, &alice).await })
            })
            .collect();

        let mut ok = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::AlreadyReturned(_)) => already += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!((ok, already), (1, 1));
        assert_eq!(book(&f.repo, "BK250001").await.available_quantity, 1);
        assert_consistent(&f.repo).await;
    }
}
