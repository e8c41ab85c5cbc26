use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Credit, LedgerEntry, Store};
use crate::{
    error::{AppError, Result},
    models::{
        course::{Course, CourseChanges},
        notification::Notification,
        progress::{ProgressKey, ProgressRecord},
        resource::ExternalResource,
        user::{User, UserChanges},
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    courses: HashMap<String, Course>,
    progress: HashMap<ProgressKey, ProgressRecord>,
    notifications: Vec<Notification>,
    resources: HashMap<String, ExternalResource>,
}

/// 进程内存储，用于 `DATABASE_URL=mem://` 和测试
/// `fail_writes(true)` 让所有写入失败且不改动数据；`set_latency` 模拟网络存储的往返延迟
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// 每次调用先等待一个往返延迟，数据在延迟之后才读取或写入
    async fn round_trip(&self) {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn check_write(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            warn!("Memory store rejecting write");
            return Err(AppError::store("Store unavailable, please try again"));
        }
        Ok(())
    }

    fn apply_credit(users: &mut HashMap<String, User>, credit: &Credit) -> Result<User> {
        let user = users
            .get_mut(&credit.user_id)
            .ok_or_else(|| AppError::not_found("User"))?;
        user.points += credit.points as i64;
        for badge in &credit.badges {
            if !user.has_badge(badge) {
                user.badges.push(badge.clone());
            }
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.round_trip().await;
        Ok(self.tables.read().users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.round_trip().await;
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.round_trip().await;
        let mut users: Vec<User> = self.tables.read().users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> Result<User> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id) {
            return Err(AppError::conflict("User already exists"));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> Result<User> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        match tables.users.get_mut(user_id) {
            Some(existing) => {
                changes.apply_to(existing);
                Ok(existing.clone())
            }
            None => Err(AppError::not_found("User")),
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        let removed = tables.users.remove(user_id).is_some();
        if removed {
            tables.progress.retain(|(uid, _), _| uid != user_id);
            tables.notifications.retain(|n| n.user_id != user_id);
        }
        Ok(removed)
    }

    async fn credit_user(&self, credit: &Credit) -> Result<User> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        Self::apply_credit(&mut tables.users, credit)
    }

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        self.round_trip().await;
        Ok(self.tables.read().courses.get(course_id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        self.round_trip().await;
        let mut courses: Vec<Course> = self.tables.read().courses.values().cloned().collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(courses)
    }

    async fn count_courses(&self) -> Result<usize> {
        self.round_trip().await;
        Ok(self.tables.read().courses.len())
    }

    async fn insert_course(&self, course: &Course) -> Result<Course> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        if tables.courses.contains_key(&course.id) {
            return Err(AppError::conflict("Course already exists"));
        }
        tables.courses.insert(course.id.clone(), course.clone());
        Ok(course.clone())
    }

    async fn update_course(&self, course_id: &str, changes: &CourseChanges) -> Result<Course> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        match tables.courses.get_mut(course_id) {
            Some(existing) => {
                changes.apply_to(existing);
                Ok(existing.clone())
            }
            None => Err(AppError::not_found("Course")),
        }
    }

    async fn delete_course(&self, course_id: &str) -> Result<bool> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        let removed = tables.courses.remove(course_id).is_some();
        if removed {
            tables.progress.retain(|(_, cid), _| cid != course_id);
        }
        Ok(removed)
    }

    async fn get_progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>> {
        self.round_trip().await;
        let key = (user_id.to_string(), course_id.to_string());
        Ok(self.tables.read().progress.get(&key).cloned())
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        self.round_trip().await;
        let mut records: Vec<ProgressRecord> = self
            .tables
            .read()
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.course_id.cmp(&b.course_id));
        Ok(records)
    }

    async fn commit(&self, entry: &LedgerEntry) -> Result<Option<User>> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();

        // 先校验，保证要么全部写入，要么什么都不写
        if let Some(credit) = &entry.credit {
            if !tables.users.contains_key(&credit.user_id) {
                return Err(AppError::not_found("User"));
            }
        }
        if entry.review.is_some() && !tables.courses.contains_key(&entry.progress.course_id) {
            return Err(AppError::not_found("Course"));
        }

        tables.progress.insert(entry.progress.key(), entry.progress.clone());

        let credited = match &entry.credit {
            Some(credit) => Some(Self::apply_credit(&mut tables.users, credit)?),
            None => None,
        };

        if let Some(review) = &entry.review {
            if let Some(course) = tables.courses.get_mut(&entry.progress.course_id) {
                course.reviews.push(review.clone());
            }
        }

        tables.notifications.extend(entry.notifications.iter().cloned());

        debug!(
            "Committed ledger entry for user {} course {}",
            entry.progress.user_id, entry.progress.course_id
        );
        Ok(credited)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<Notification> {
        self.round_trip().await;
        self.check_write()?;
        self.tables.write().notifications.push(notification.clone());
        Ok(notification.clone())
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.round_trip().await;
        let mut notifications: Vec<Notification> = self
            .tables
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        // 插入顺序保证同一时间戳下的先后
        notifications.reverse();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<bool> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.round_trip().await;
        self.check_write()?;
        let mut tables = self.tables.write();
        let mut updated = 0;
        for notification in tables.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.read) {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_resources(&self) -> Result<Vec<ExternalResource>> {
        self.round_trip().await;
        let mut resources: Vec<ExternalResource> = self.tables.read().resources.values().cloned().collect();
        resources.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(resources)
    }

    async fn insert_resource(&self, resource: &ExternalResource) -> Result<ExternalResource> {
        self.round_trip().await;
        self.check_write()?;
        self.tables.write().resources.insert(resource.id.clone(), resource.clone());
        Ok(resource.clone())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool> {
        self.round_trip().await;
        self.check_write()?;
        Ok(self.tables.write().resources.remove(resource_id).is_some())
    }
}
