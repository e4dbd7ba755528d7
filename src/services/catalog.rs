//! Catalog management service

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{generate_book_id, Book, BookQuery, CreateBook, UpdateBook},
    repository::{Repository, UnitOfWork},
};

/// Attempts at finding a free book identifier before giving up
const BOOK_ID_ATTEMPTS: usize = 5;

/// Paginated catalog listing
#[derive(Debug, Serialize, ToSchema)]
pub struct BookList {
    pub books: Vec<Book>,
    /// Books matching the filters
    pub total: i64,
    /// Copies owned across the whole catalog
    pub total_books: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn Repository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<BookList> {
        let mut uow = self.repository.begin().await?;
        let (books, total) = uow.list_books(query).await?;
        let total_books = uow.total_quantity().await?;
        Ok(BookList {
            books,
            total,
            total_books,
        })
    }

    pub async fn get_book(&self, book_id: &str) -> AppResult<Book> {
        let mut uow = self.repository.begin().await?;
        uow.get_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))
    }

    /// Add a book to the catalog; every copy starts on the shelf
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;

        let now = Utc::now();
        for attempt in 1..=BOOK_ID_ATTEMPTS {
            let book_id = generate_book_id(now, rand::thread_rng().gen_range(0..10_000));
            let candidate = Book {
                book_id,
                title: book.title.clone(),
                author: book.author.clone(),
                publication_year: book.publication_year,
                publisher: book.publisher.clone(),
                category: book.category.clone(),
                location: book.location.clone(),
                quantity: book.quantity,
                available_quantity: book.quantity,
                date_added: now.date_naive(),
            };

            // A failed insert poisons a database transaction, so each attempt gets its own.
            let mut uow = self.repository.begin().await?;
            match uow.insert_book(&candidate).await {
                Ok(created) => {
                    uow.commit().await?;
                    tracing::info!(book_id = %created.book_id, quantity = created.quantity, "Book created");
                    return Ok(created);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(attempt, book_id = %candidate.book_id, "Book id collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(
            "Could not allocate a free book identifier".to_string(),
        ))
    }

    /// Apply a partial update; a quantity change moves availability by the same delta
    pub async fn update_book(&self, book_id: &str, update: UpdateBook) -> AppResult<Book> {
        update.validate()?;

        let mut uow = self.repository.begin().await?;
        let mut book = uow
            .lock_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(author) = update.author {
            book.author = author;
        }
        if update.publication_year.is_some() {
            book.publication_year = update.publication_year;
        }
        if update.publisher.is_some() {
            book.publisher = update.publisher;
        }
        if update.category.is_some() {
            book.category = update.category;
        }
        if update.location.is_some() {
            book.location = update.location;
        }
        if let Some(quantity) = update.quantity {
            let available = book.available_quantity + (quantity - book.quantity);
            if available < 0 {
                return Err(AppError::Validation(format!(
                    "Quantity {} is lower than the {} copies currently on loan",
                    quantity,
                    book.on_loan()
                )));
            }
            book.quantity = quantity;
            book.available_quantity = available;
        }

        let book = uow.update_book(&book).await?;
        uow.commit().await?;

        tracing::info!(book_id = %book.book_id, quantity = book.quantity, available = book.available_quantity, "Book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, book_id: &str) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        if !remove_book(uow.as_mut(), book_id).await? {
            return Err(AppError::NotFound(format!("Book {} not found", book_id)));
        }
        uow.commit().await?;

        tracing::info!(book_id, "Book deleted");
        Ok(())
    }

    /// Delete several books at once; unknown ids are skipped, a book that cannot be removed aborts the whole batch
    pub async fn delete_books(&self, book_ids: &[String]) -> AppResult<u64> {
        if book_ids.is_empty() {
            return Err(AppError::BadRequest("No book ids given".to_string()));
        }

        let mut uow = self.repository.begin().await?;
        let mut deleted = 0;
        for book_id in book_ids {
            if remove_book(uow.as_mut(), book_id).await? {
                deleted += 1;
            }
        }
        uow.commit().await?;

        tracing::info!(requested = book_ids.len(), deleted, "Books deleted");
        Ok(deleted)
    }
}

/// Delete a book that has neither copies on loan nor requests awaiting a decision
async fn remove_book(uow: &mut dyn UnitOfWork, book_id: &str) -> AppResult<bool> {
    if uow.lock_book(book_id).await?.is_none() {
        return Ok(false);
    }
    let active = uow.count_active_records(book_id).await?;
    if active > 0 {
        return Err(AppError::Conflict(format!(
            "Book {} has {} copies on loan",
            book_id, active
        )));
    }
    // Pending requests hold a slot of their requester's counter; decide them first.
    let pending = uow.count_pending_requests(book_id).await?;
    if pending > 0 {
        return Err(AppError::Conflict(format!(
            "Book {} has {} pending borrow requests",
            book_id, pending
        )));
    }
    uow.delete_book(book_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{record::NewBorrowingRecord, user::UserClaims};
    use crate::repository::MemoryRepository;
    use crate::services::{borrow::BorrowService, test_support::assert_consistent};
    use chrono::Duration;

    fn dune(quantity: i32) -> CreateBook {
        CreateBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publication_year: Some(1965),
            publisher: Some("Chilton".to_string()),
            category: Some("Science Fiction".to_string()),
            location: Some("A3".to_string()),
            quantity,
        }
    }

    fn service() -> (MemoryRepository, CatalogService) {
        let repo = MemoryRepository::new();
        (repo.clone(), CatalogService::new(Arc::new(repo)))
    }

    async fn lend(repo: &MemoryRepository, book: &Book) {
        let mut uow = repo.begin().await.unwrap();
        let now = Utc::now();
        uow.insert_record(&NewBorrowingRecord {
            user_id: 1,
            book_id: book.book_id.clone(),
            request_id: None,
            borrow_date: now,
            due_date: now + Duration::days(10),
        })
        .await
        .unwrap();
        uow.update_book(&Book {
            available_quantity: book.available_quantity - 1,
            ..book.clone()
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_book_starts_fully_available() {
        let (_, service) = service();
        let book = service.create_book(dune(4)).await.unwrap();
        assert_eq!(book.quantity, 4);
        assert_eq!(book.available_quantity, 4);
        assert!(book.book_id.starts_with("BK"));
        assert_eq!(book.book_id.len(), 8);
        assert_eq!(service.get_book(&book.book_id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_create_book_rejects_negative_quantity() {
        let (_, service) = service();
        assert!(matches!(
            service.create_book(dune(-1)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_reports_total_copies() {
        let (_, service) = service();
        service.create_book(dune(4)).await.unwrap();
        service
            .create_book(CreateBook {
                title: "Kindred".to_string(),
                author: "Octavia Butler".to_string(),
                category: None,
                ..dune(2)
            })
            .await
            .unwrap();

        let list = service
            .list_books(&BookQuery {
                category: Some("Science Fiction".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.books[0].title, "Dune");
        assert_eq!(list.total_books, 6);
    }

    #[tokio::test]
    async fn test_quantity_update_shifts_availability() {
        let (repo, service) = service();
        let book = service.create_book(dune(3)).await.unwrap();
        lend(&repo, &book).await;

        let grown = service
            .update_book(&book.book_id, UpdateBook { quantity: Some(5), ..Default::default() })
            .await
            .unwrap();
        assert_eq!((grown.quantity, grown.available_quantity), (5, 4));

        let shrunk = service
            .update_book(&book.book_id, UpdateBook { quantity: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!((shrunk.quantity, shrunk.available_quantity), (1, 0));

        let err = service
            .update_book(&book.book_id, UpdateBook { quantity: Some(0), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.get_book(&book.book_id).await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let (_, service) = service();
        let book = service.create_book(dune(1)).await.unwrap();
        let updated = service
            .update_book(
                &book.book_id,
                UpdateBook { location: Some("B1".to_string()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.location.as_deref(), Some("B1"));
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.publisher.as_deref(), Some("Chilton"));
    }

    #[tokio::test]
    async fn test_delete_refused_while_on_loan() {
        let (repo, service) = service();
        let lent = service.create_book(dune(1)).await.unwrap();
        let idle = service.create_book(dune(1)).await.unwrap();
        lend(&repo, &lent).await;

        assert!(matches!(
            service.delete_book(&lent.book_id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service.delete_books(&[idle.book_id.clone(), lent.book_id.clone()]).await,
            Err(AppError::Conflict(_))
        ));
        // The batch was rolled back
        assert!(service.get_book(&idle.book_id).await.is_ok());

        service.delete_book(&idle.book_id).await.unwrap();
        assert!(matches!(
            service.get_book(&idle.book_id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_book(&idle.book_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_delete_counts_removed_books() {
        let (_, service) = service();
        let a = service.create_book(dune(1)).await.unwrap();
        let b = service.create_book(dune(2)).await.unwrap();

        assert!(matches!(service.delete_books(&[]).await, Err(AppError::BadRequest(_))));

        let deleted = service
            .delete_books(&[a.book_id, b.book_id, "BK999999".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(service.list_books(&BookQuery::default()).await.unwrap().total_books, 0);
    }

    #[tokio::test]
    async fn test_delete_refused_while_requests_pending() {
        let (repo, service) = service();
        let borrows = BorrowService::new(Arc::new(repo.clone()), 10);
        let admin = UserClaims::new(100, "librarian", true, Duration::hours(1));
        let alice = UserClaims::new(1, "alice", false, Duration::hours(1));

        let book = service.create_book(dune(1)).await.unwrap();
        let request = borrows.create_request(&alice, &book.book_id).await.unwrap();

        assert!(matches!(
            service.delete_book(&book.book_id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service.delete_books(&[book.book_id.clone()]).await,
            Err(AppError::Conflict(_))
        ));
        assert_consistent(&repo).await;

        borrows.reject_request(request.id, &admin).await.unwrap();
        service.delete_book(&book.book_id).await.unwrap();
        assert_consistent(&repo).await;

        let users = repo.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].request_count, 0);
    }
}
