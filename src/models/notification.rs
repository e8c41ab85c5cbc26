use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::utils::serde_helpers::record_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(with = "record_key")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(user_id: &str, notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            notification_type,
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Approval,
    Certificate,
    NewCourse,
    Badge,
    AdminMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdminMessageRequest {
    pub user_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}
