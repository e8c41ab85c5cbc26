use crate::{
    error::Result,
    models::{
        notification::{AdminMessageRequest, Notification},
        response::ApiResponse,
        toast::Toast,
    },
    services::auth::{AdminUser, CurrentUser},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/message", post(send_message))
        .route("/:id/read", post(mark_read))
}

/// 最新的在前
/// GET /api/learn/notifications
pub async fn list_notifications(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = app_state.notification_service.list(&user.id).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// 标记单条通知已读
/// POST /api/learn/notifications/:id/read
pub async fn mark_read(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    app_state.notification_service.mark_read(&user.id, &notification_id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// 全部标记已读
/// POST /api/learn/notifications/read-all
pub async fn mark_all_read(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Value>>> {
    let updated = app_state.notification_service.mark_all_read(&user.id).await?;
    Ok(Json(ApiResponse::success(json!({ "updated": updated }))))
}

/// 管理员向用户发送消息
/// POST /api/learn/notifications/message
pub async fn send_message(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(request): Json<AdminMessageRequest>,
) -> Result<Json<ApiResponse<Notification>>> {
    request.validate()?;
    let notification = app_state.notification_service.send_admin_message(&request).await?;
    Ok(Json(ApiResponse::with_toast(notification, Toast::success("Message sent."))))
}
