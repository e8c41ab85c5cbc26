use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Credit, LedgerEntry, Store};
use crate::{
    error::{AppError, Result},
    models::{
        course::{Course, CourseChanges},
        notification::Notification,
        progress::ProgressRecord,
        resource::ExternalResource,
        user::{User, UserChanges},
    },
    services::Database,
};

/// 基于 SurrealDB 的存储
/// 记录通过 `type::thing` 定位，读取时用 `meta::id` 还原为裸键
#[derive(Clone)]
pub struct SurrealStore {
    db: Arc<Database>,
}

/// 写入时去掉 id 字段，由记录ID本身承载
fn content_without_id<T: Serialize>(value: &T) -> Result<Value> {
    let mut content = serde_json::to_value(value)?;
    if let Some(object) = content.as_object_mut() {
        object.remove("id");
    }
    Ok(content)
}

impl SurrealStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn create_record<T: Serialize>(&self, table: &str, id: &str, value: &T) -> Result<()> {
        let sql = format!("CREATE type::thing('{}', $id) CONTENT $content RETURN NONE", table);
        self.db
            .query_with_params(&sql, json!({ "id": id, "content": content_without_id(value)? }))
            .await?;
        Ok(())
    }

    /// 只对给出的字段执行 SET，其余字段（积分、徽章、评价）保持不变
    /// 记录不存在时返回 false
    async fn set_fields<T: Serialize>(&self, table: &str, id: &str, changes: &T) -> Result<bool> {
        let fields = match serde_json::to_value(changes)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };

        if fields.is_empty() {
            let sql = format!("SELECT meta::id(id) AS id FROM type::thing('{}', $id)", table);
            let rows: Vec<Value> = self.db.fetch_all(&sql, json!({ "id": id })).await?;
            return Ok(!rows.is_empty());
        }

        let assignments: Vec<String> = fields
            .keys()
            .map(|field| format!("{field} = $set_{field}", field = field))
            .collect();
        let sql = format!(
            "UPDATE {table} SET {assignments} WHERE id = type::thing('{table}', $id) RETURN meta::id(id) AS id",
            table = table,
            assignments = assignments.join(", ")
        );

        let mut params = Map::new();
        params.insert("id".to_string(), json!(id));
        for (field, value) in fields {
            params.insert(format!("set_{}", field), value);
        }

        let rows: Vec<Value> = self.db.fetch_all(&sql, Value::Object(params)).await?;
        Ok(!rows.is_empty())
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<bool> {
        let sql = format!("DELETE type::thing('{}', $id) RETURN BEFORE", table);
        let rows: Vec<Value> = self.db.fetch_all(&sql, json!({ "id": id })).await?;
        Ok(!rows.is_empty())
    }

    fn credit_statement() -> &'static str {
        "UPDATE user SET points += $credit_points, badges = array::union(badges, $credit_badges) \
         WHERE id = type::thing('user', $credit_user);"
    }
}

#[async_trait]
impl Store for SurrealStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.db
            .fetch_one(
                "SELECT *, meta::id(id) AS id FROM type::thing('user', $id)",
                json!({ "id": user_id }),
            )
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db
            .fetch_one(
                "SELECT *, meta::id(id) AS id FROM user WHERE string::lowercase(email) = string::lowercase($email) LIMIT 1",
                json!({ "email": email }),
            )
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.db
            .fetch_all("SELECT *, meta::id(id) AS id FROM user ORDER BY created_at", json!({}))
            .await
    }

    async fn insert_user(&self, user: &User) -> Result<User> {
        self.create_record("user", &user.id, user).await?;
        info!("Created user record {}", user.id);
        Ok(user.clone())
    }

    async fn update_user(&self, user_id: &str, changes: &UserChanges) -> Result<User> {
        if !self.set_fields("user", user_id, changes).await? {
            return Err(AppError::not_found("User"));
        }
        self.get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool> {
        let removed = self.delete_record("user", user_id).await?;
        if removed {
            self.db
                .query_with_params(
                    "DELETE user_progress WHERE user_id = $id; DELETE notification WHERE user_id = $id;",
                    json!({ "id": user_id }),
                )
                .await?;
        }
        Ok(removed)
    }

    async fn credit_user(&self, credit: &Credit) -> Result<User> {
        self.db
            .query_with_params(
                Self::credit_statement(),
                json!({
                    "credit_user": credit.user_id,
                    "credit_points": credit.points,
                    "credit_badges": credit.badges,
                }),
            )
            .await?;
        self.get_user(&credit.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        self.db
            .fetch_one(
                "SELECT *, meta::id(id) AS id FROM type::thing('course', $id)",
                json!({ "id": course_id }),
            )
            .await
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        self.db
            .fetch_all("SELECT *, meta::id(id) AS id FROM course ORDER BY created_at", json!({}))
            .await
    }

    async fn count_courses(&self) -> Result<usize> {
        let rows: Vec<Value> = self
            .db
            .fetch_all("SELECT count() AS count FROM course GROUP ALL", json!({}))
            .await?;
        let count = rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(count as usize)
    }

    async fn insert_course(&self, course: &Course) -> Result<Course> {
        self.create_record("course", &course.id, course).await?;
        Ok(course.clone())
    }

    async fn update_course(&self, course_id: &str, changes: &CourseChanges) -> Result<Course> {
        if !self.set_fields("course", course_id, changes).await? {
            return Err(AppError::not_found("Course"));
        }
        self.get_course(course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))
    }

    async fn delete_course(&self, course_id: &str) -> Result<bool> {
        let removed = self.delete_record("course", course_id).await?;
        if removed {
            self.db
                .query_with_params(
                    "DELETE user_progress WHERE course_id = $id",
                    json!({ "id": course_id }),
                )
                .await?;
        }
        Ok(removed)
    }

    async fn get_progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>> {
        self.db
            .fetch_one(
                "SELECT * FROM type::thing('user_progress', [$user_id, $course_id])",
                json!({ "user_id": user_id, "course_id": course_id }),
            )
            .await
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        self.db
            .fetch_all(
                "SELECT * FROM user_progress WHERE user_id = $user_id ORDER BY course_id",
                json!({ "user_id": user_id }),
            )
            .await
    }

    async fn commit(&self, entry: &LedgerEntry) -> Result<Option<User>> {
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        sql.push_str(
            "UPDATE type::thing('user_progress', [$user_id, $course_id]) CONTENT $progress RETURN NONE;\n",
        );
        if entry.credit.is_some() {
            sql.push_str(Self::credit_statement());
            sql.push('\n');
        }
        if entry.review.is_some() {
            sql.push_str(
                "UPDATE course SET reviews += $review WHERE id = type::thing('course', $course_id) RETURN NONE;\n",
            );
        }
        if !entry.notifications.is_empty() {
            sql.push_str("INSERT INTO notification $notifications RETURN NONE;\n");
        }
        sql.push_str("COMMIT TRANSACTION;");

        let credit = entry.credit.clone().unwrap_or(Credit {
            user_id: String::new(),
            points: 0,
            badges: Vec::new(),
        });

        debug!(
            "Committing ledger entry for user {} course {}",
            entry.progress.user_id, entry.progress.course_id
        );
        self.db
            .query_with_params(
                &sql,
                json!({
                    "user_id": entry.progress.user_id,
                    "course_id": entry.progress.course_id,
                    "progress": entry.progress,
                    "credit_user": credit.user_id,
                    "credit_points": credit.points,
                    "credit_badges": credit.badges,
                    "review": entry.review,
                    "notifications": entry.notifications,
                }),
            )
            .await?;

        match &entry.credit {
            Some(credit) => Ok(Some(
                self.get_user(&credit.user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("User"))?,
            )),
            None => Ok(None),
        }
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<Notification> {
        self.create_record("notification", &notification.id, notification).await?;
        Ok(notification.clone())
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.db
            .fetch_all(
                "SELECT *, meta::id(id) AS id FROM notification WHERE user_id = $user_id ORDER BY timestamp DESC",
                json!({ "user_id": user_id }),
            )
            .await
    }

    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<bool> {
        let rows: Vec<Value> = self
            .db
            .fetch_all(
                "UPDATE notification SET read = true \
                 WHERE id = type::thing('notification', $id) AND user_id = $user_id \
                 RETURN meta::id(id) AS id",
                json!({ "id": notification_id, "user_id": user_id }),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let rows: Vec<Value> = self
            .db
            .fetch_all(
                "UPDATE notification SET read = true WHERE user_id = $user_id AND read = false \
                 RETURN meta::id(id) AS id",
                json!({ "user_id": user_id }),
            )
            .await?;
        Ok(rows.len())
    }

    async fn list_resources(&self) -> Result<Vec<ExternalResource>> {
        self.db
            .fetch_all(
                "SELECT *, meta::id(id) AS id FROM external_resource ORDER BY title",
                json!({}),
            )
            .await
    }

    async fn insert_resource(&self, resource: &ExternalResource) -> Result<ExternalResource> {
        self.create_record("external_resource", &resource.id, resource).await?;
        Ok(resource.clone())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool> {
        self.delete_record("external_resource", resource_id).await
    }
}
