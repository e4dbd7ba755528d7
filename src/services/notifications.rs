//! In-app notifications of a user

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::notification::Notification,
    repository::Repository,
};

#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn Repository>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Notifications of a user, newest first
    pub async fn list(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        let mut uow = self.repository.begin().await?;
        uow.list_notifications(user_id).await
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        let mut uow = self.repository.begin().await?;
        let notification = uow
            .mark_notification_read(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        uow.commit().await?;
        Ok(notification)
    }

    pub async fn delete(&self, id: i32, user_id: i32) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        if !uow.delete_notification(id, user_id).await? {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        uow.commit().await?;
        tracing::debug!(id, user_id, "Notification deleted");
        Ok(())
    }
}
