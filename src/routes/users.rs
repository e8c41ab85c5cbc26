use crate::{
    error::{AppError, Result},
    models::{
        response::ApiResponse,
        toast::Toast,
        user::*,
    },
    services::auth::{AdminUser, CurrentUser, Identity},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // 注册与个人资料
        .route("/register", post(register))
        .route("/me", get(get_me).put(update_me))
        .route("/leaderboard", get(leaderboard))

        // 管理员路由
        .route("/", get(list_users))
        .route("/:id", put(admin_update_user).delete(delete_user))
        .route("/:id/approve", post(approve_user))
        .route("/:id/points", post(award_points))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub status: UserStatusFilter,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// 注册新用户（待审核）
/// POST /api/learn/users/register
pub async fn register(
    State(app_state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>)> {
    if !app_state.is_feature_enabled("registrations") {
        return Err(AppError::forbidden("Registrations are currently closed"));
    }
    debug!("Registering user {}", identity.user_id);

    let user = app_state.user_service.register(&identity.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_toast(
            user,
            Toast::success("Registration successful! Your account is pending administrator approval."),
        )),
    ))
}

/// 获取当前用户资料
/// GET /api/learn/users/me
pub async fn get_me(CurrentUser(user): CurrentUser) -> Result<Json<ApiResponse<User>>> {
    Ok(Json(ApiResponse::success(user)))
}

/// 更新当前用户资料
/// PUT /api/learn/users/me
pub async fn update_me(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let updated = app_state.user_service.update_profile(&user.id, request).await?;
    Ok(Json(ApiResponse::with_toast(updated, Toast::success("Profile updated successfully!"))))
}

/// 积分排行榜
/// GET /api/learn/users/leaderboard
pub async fn leaderboard(
    State(app_state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let limit = query.limit.unwrap_or(20).min(100); // 限制最大数量
    let entries = app_state.user_service.leaderboard(limit).await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// 按审核状态列出用户
/// GET /api/learn/users?status=pending
pub async fn list_users(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    debug!("Listing users with filter {:?}", query.status);
    let users = app_state.user_service.list_users(query.status).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// 审核通过
/// POST /api/learn/users/:id/approve
pub async fn approve_user(
    State(app_state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<User>>> {
    let user = app_state.user_service.approve(&user_id).await?;
    info!("User {} approved by {}", user_id, admin.id);
    Ok(Json(ApiResponse::with_toast(user, Toast::success("User approved."))))
}

/// 管理员编辑用户
/// PUT /api/learn/users/:id
pub async fn admin_update_user(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let user = app_state.user_service.admin_update(&user_id, request).await?;
    Ok(Json(ApiResponse::with_toast(user, Toast::success("User updated successfully."))))
}

/// 删除用户
/// DELETE /api/learn/users/:id
pub async fn delete_user(
    State(app_state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    app_state.user_service.delete(&user_id).await?;
    info!("User {} deleted by {}", user_id, admin.id);
    Ok(Json(ApiResponse::with_toast((), Toast::success("User deleted successfully."))))
}

/// 管理员手动加分
/// POST /api/learn/users/:id/points
pub async fn award_points(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    Json(request): Json<AwardPointsRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let user = app_state.ledger.award_points(&user_id, request.points).await?;
    Ok(Json(ApiResponse::success(user)))
}
