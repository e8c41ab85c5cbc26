use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, Result},
    models::{
        notification::{AdminMessageRequest, Notification, NotificationType},
        user::User,
    },
    services::{realtime::NotificationHub, store::Store},
};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>, hub: NotificationHub) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// 持久化后再推送；写入失败时不推送
    pub async fn create(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        message: impl Into<String>,
    ) -> Result<Notification> {
        let notification = Notification::new(user_id, notification_type, message);
        let stored = self.store.insert_notification(&notification).await?;
        debug!("Created {:?} notification for user {}", notification_type, user_id);
        self.hub.publish(&stored);
        Ok(stored)
    }

    /// 推送已随账本条目提交的通知
    pub fn publish_all(&self, notifications: &[Notification]) {
        for notification in notifications {
            self.hub.publish(notification);
        }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.store.list_notifications(user_id).await
    }

    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        if !self.store.mark_notification_read(user_id, notification_id).await? {
            return Err(AppError::not_found("Notification"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        let updated = self.store.mark_all_notifications_read(user_id).await?;
        debug!("Marked {} notification(s) read for user {}", updated, user_id);
        Ok(updated)
    }

    pub async fn send_admin_message(&self, request: &AdminMessageRequest) -> Result<Notification> {
        if self.store.get_user(&request.user_id).await?.is_none() {
            return Err(AppError::not_found("User"));
        }
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AppError::validation("Message cannot be empty"));
        }
        info!("Admin message sent to user {}", request.user_id);
        self.create(&request.user_id, NotificationType::AdminMessage, message).await
    }

    /// 新课程上线时通知所有已审核员工，单个失败不影响其他人
    pub async fn announce_course(&self, title: &str, recipients: &[User]) -> usize {
        let message = format!("A new course is available: \"{}\".", title);
        let mut delivered = 0;
        for user in recipients {
            match self.create(&user.id, NotificationType::NewCourse, message.clone()).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!("Failed to notify user {} about new course: {}", user.id, e),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    fn service() -> (NotificationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone(), NotificationHub::new(16));
        (service, store)
    }

    #[tokio::test]
    async fn test_create_persists_and_pushes() {
        let (service, _) = service();
        let mut sub = service.hub().subscribe("user-1");

        let created = service
            .create("user-1", NotificationType::Approval, "Welcome")
            .await
            .unwrap();

        assert_eq!(service.list("user-1").await.unwrap().len(), 1);
        assert_eq!(sub.recv().await.map(|n| n.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_failed_write_is_not_pushed() {
        let (service, store) = service();
        store.fail_writes(true);
        assert!(service.create("user-1", NotificationType::Badge, "x").await.is_err());
        store.fail_writes(false);
        assert!(service.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_only_for_owner() {
        let (service, _) = service();
        let created = service
            .create("user-1", NotificationType::Badge, "badge")
            .await
            .unwrap();

        assert!(matches!(
            service.mark_read("user-2", &created.id).await,
            Err(AppError::NotFound(_))
        ));
        service.mark_read("user-1", &created.id).await.unwrap();
        assert!(service.list("user-1").await.unwrap()[0].read);
        assert_eq!(service.mark_all_read("user-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_admin_message_requires_known_user() {
        let (service, _) = service();
        let request = AdminMessageRequest {
            user_id: "ghost".to_string(),
            message: "hello".to_string(),
        };
        assert!(matches!(
            service.send_admin_message(&request).await,
            Err(AppError::NotFound(_))
        ));
    }
}
