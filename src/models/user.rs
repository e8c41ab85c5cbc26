use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::utils::serde_helpers::record_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Employee,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(with = "record_key")]
    pub id: String, // 认证服务签发的用户ID (JWT sub)
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub approved: bool,
    pub points: i64,
    pub badges: Vec<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 新注册用户：普通员工、未审核、0 积分
    pub fn registered(id: &str, name: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: UserRole::Employee,
            approved: false,
            points: 0,
            badges: Vec::new(),
            profile_image_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b == badge_id)
    }
}

/// 资料字段的局部更新，只写入给出的字段
/// 积分和徽章不在其中，只能通过账本入账变化
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl UserChanges {
    pub fn approve() -> Self {
        Self {
            approved: Some(true),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(approved) = self.approved {
            user.approved = approved;
        }
        if let Some(url) = &self.profile_image_url {
            user.profile_image_url = Some(url.clone());
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(url)]
    pub profile_image_url: Option<String>,
}

/// 管理员编辑用户
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    #[validate(url)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AwardPointsRequest {
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatusFilter {
    #[default]
    All,
    Approved,
    Pending,
}

impl UserStatusFilter {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserStatusFilter::All => true,
            UserStatusFilter::Approved => user.approved,
            UserStatusFilter::Pending => !user.approved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub points: i64,
    pub badges: Vec<String>,
    pub profile_image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_leave_points_and_badges_alone() {
        let mut user = User::registered("user-1", "Aisha", "aisha@example.com");
        user.points = 120;
        user.badges.push("first-course".to_string());

        let changes = UserChanges {
            name: Some("Aisha Ahmed".to_string()),
            ..UserChanges::default()
        };
        changes.apply_to(&mut user);

        assert_eq!(user.name, "Aisha Ahmed");
        assert_eq!(user.points, 120);
        assert_eq!(user.badges, vec!["first-course".to_string()]);

        let fields = serde_json::to_value(&changes).unwrap();
        assert_eq!(fields, serde_json::json!({ "name": "Aisha Ahmed" }));
    }
}
