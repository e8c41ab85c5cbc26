//! 持久化接口。外部存储是所有数据的权威来源，进程内状态只是其已确认写入的镜像
//! 更新只写入给出的字段，积分、徽章和评价只能通过账本条目变化

pub mod memory;
pub mod surreal;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        course::{Course, CourseChanges, Review},
        notification::Notification,
        progress::ProgressRecord,
        resource::ExternalResource,
        user::{User, UserChanges},
    },
};

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

/// 账本条目中给某个用户的积分和徽章
#[derive(Debug, Clone, PartialEq)]
pub struct Credit {
    pub user_id: String,
    pub points: u32,
    pub badges: Vec<String>,
}

/// 一次账本操作的全部写入，要么全部生效，要么全部不生效
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub progress: ProgressRecord,
    pub credit: Option<Credit>,
    pub notifications: Vec<Notification>,
    pub review: Option<Review>,
}

impl LedgerEntry {
    pub fn progress(progress: ProgressRecord) -> Self {
        Self {
            progress,
            credit: None,
            notifications: Vec::new(),
            review: None,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // 用户
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn insert_user(&self, user: &User) -> Result<User>;
    /// 只更新给出的资料字段，返回更新后的用户
    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> Result<User>;
    async fn delete_user(&self, user_id: &str) -> Result<bool>;
    /// 增加积分并合并徽章，返回写入后的用户
    async fn credit_user(&self, credit: &Credit) -> Result<User>;

    // 课程
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>>;
    async fn list_courses(&self) -> Result<Vec<Course>>;
    async fn count_courses(&self) -> Result<usize>;
    async fn insert_course(&self, course: &Course) -> Result<Course>;
    async fn update_course(&self, course_id: &str, changes: &CourseChanges) -> Result<Course>;
    async fn delete_course(&self, course_id: &str) -> Result<bool>;

    // 进度
    async fn get_progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>>;
    async fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>>;

    /// 原子地写入账本条目；条目包含入账时返回入账后的用户
    async fn commit(&self, entry: &LedgerEntry) -> Result<Option<User>>;

    // 通知
    async fn insert_notification(&self, notification: &Notification) -> Result<Notification>;
    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<bool>;
    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize>;

    // 外部资源
    async fn list_resources(&self) -> Result<Vec<ExternalResource>>;
    async fn insert_resource(&self, resource: &ExternalResource) -> Result<ExternalResource>;
    async fn delete_resource(&self, resource_id: &str) -> Result<bool>;
}
