use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        notification::NotificationType,
        user::{
            AdminUpdateUserRequest, LeaderboardEntry, RegisterRequest, UpdateProfileRequest, User,
            UserChanges, UserRole, UserStatusFilter,
        },
    },
    services::{notification::NotificationService, store::Store},
    utils::{cache::ProgressCache, validation},
};

pub const APPROVAL_MESSAGE: &str = "Welcome to the platform! Your registration has been approved.";

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    notifications: Arc<NotificationService>,
    cache: ProgressCache,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, notifications: Arc<NotificationService>, cache: ProgressCache) -> Self {
        Self {
            store,
            notifications,
            cache,
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.store.get_user(user_id).await
    }

    pub async fn require_user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 注册：身份来自认证服务签发的 JWT，新用户默认未审核
    pub async fn register(&self, user_id: &str, request: RegisterRequest) -> Result<User> {
        request.validate()?;
        validation::validate_display_name(&request.name)?;
        let email = request.email.trim().to_lowercase();
        validation::validate_email_format(&email)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("An account with this email already exists."));
        }
        if self.store.get_user(user_id).await?.is_some() {
            return Err(AppError::conflict("This account is already registered."));
        }

        let user = User::registered(user_id, request.name.trim(), &email);
        let user = self.store.insert_user(&user).await?;
        info!("Registered user {} ({}), pending approval", user.id, user.email);
        Ok(user)
    }

    pub async fn list_users(&self, filter: UserStatusFilter) -> Result<Vec<User>> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    pub async fn approve(&self, user_id: &str) -> Result<User> {
        let user = self.require_user(user_id).await?;
        if user.approved {
            debug!("User {} already approved", user_id);
            return Ok(user);
        }
        let user = self.store.update_user(user_id, &UserChanges::approve()).await?;
        info!("Approved user {}", user_id);

        if let Err(e) = self
            .notifications
            .create(user_id, NotificationType::Approval, APPROVAL_MESSAGE)
            .await
        {
            warn!("Failed to send approval notification to {}: {}", user_id, e);
        }
        Ok(user)
    }

    /// 只写入请求中出现的字段，积分与徽章由账本维护
    pub async fn update_profile(&self, user_id: &str, request: UpdateProfileRequest) -> Result<User> {
        request.validate()?;
        let mut changes = UserChanges::default();
        if let Some(name) = request.name {
            validation::validate_display_name(&name)?;
            changes.name = Some(name.trim().to_string());
        }
        changes.profile_image_url = request.profile_image_url;

        let user = self.store.update_user(user_id, &changes).await?;
        debug!("Updated profile for user {}", user_id);
        Ok(user)
    }

    /// 管理员编辑用户，管理员账号不可通过此接口修改
    pub async fn admin_update(&self, user_id: &str, request: AdminUpdateUserRequest) -> Result<User> {
        request.validate()?;
        let user = self.require_user(user_id).await?;
        if user.is_admin() {
            return Err(AppError::forbidden("Administrator accounts cannot be edited here"));
        }

        let mut changes = UserChanges::default();
        if let Some(name) = request.name {
            validation::validate_display_name(&name)?;
            changes.name = Some(name.trim().to_string());
        }
        if let Some(email) = request.email {
            let email = email.trim().to_lowercase();
            validation::validate_email_format(&email)?;
            if let Some(existing) = self.store.find_user_by_email(&email).await? {
                if existing.id != user.id {
                    return Err(AppError::conflict("An account with this email already exists."));
                }
            }
            changes.email = Some(email);
        }
        changes.role = request.role;
        changes.profile_image_url = request.profile_image_url;

        let user = self.store.update_user(user_id, &changes).await?;
        info!("Admin updated user {}", user_id);
        Ok(user)
    }

    pub async fn delete(&self, user_id: &str) -> Result<()> {
        let user = self.require_user(user_id).await?;
        if user.is_admin() {
            return Err(AppError::forbidden("Administrator accounts cannot be deleted"));
        }
        if !self.store.delete_user(user_id).await? {
            return Err(AppError::not_found("User"));
        }
        self.cache.invalidate_where(|(uid, _)| uid == user_id);
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// 员工积分排行：积分降序，同分按姓名
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut employees: Vec<User> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.role == UserRole::Employee && u.approved)
            .collect();
        employees.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));

        Ok(employees
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i + 1,
                user_id: u.id,
                name: u.name,
                points: u.points,
                badges: u.badges,
                profile_image_url: u.profile_image_url,
            })
            .collect())
    }
}
