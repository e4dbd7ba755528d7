//! Business logic services

pub mod borrow;
pub mod catalog;
pub mod notifications;

use std::sync::Arc;

use crate::{config::LibraryConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub borrows: borrow::BorrowService,
    pub notifications: notifications::NotificationService,
    repository: Arc<dyn Repository>,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Arc<dyn Repository>, library: &LibraryConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            borrows: borrow::BorrowService::new(repository.clone(), library.loan_period_days),
            notifications: notifications::NotificationService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the repository can open a unit of work
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        let _uow = self.repository.begin().await?;
        Ok(())
    }
}
