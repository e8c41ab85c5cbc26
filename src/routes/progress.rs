use crate::{
    error::{AppError, Result},
    models::{
        progress::{ProgressRecord, ProgressView},
        response::ApiResponse,
    },
    services::auth::{AdminUser, CurrentUser},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(my_progress))
        .route("/:course_id", get(course_progress))
        .route("/users/:user_id", get(user_progress))
}

/// 附带按课程当前模块计算的学习阶段
async fn with_stages(app_state: &AppState, records: Vec<ProgressRecord>) -> Result<Vec<ProgressView>> {
    let courses = app_state.store.list_courses().await?;
    Ok(records
        .into_iter()
        .map(|record| {
            let modules = courses
                .iter()
                .find(|c| c.id == record.course_id)
                .map(|c| c.modules.as_slice())
                .unwrap_or(&[]);
            ProgressView::new(record, modules)
        })
        .collect())
}

/// 当前用户的全部课程进度
/// GET /api/learn/progress
pub async fn my_progress(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<ProgressView>>>> {
    let records = app_state.ledger.list_progress(&user.id).await?;
    Ok(Json(ApiResponse::success(with_stages(&app_state, records).await?)))
}

/// 当前用户在某门课程的进度
/// GET /api/learn/progress/:course_id
pub async fn course_progress(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<ProgressView>>> {
    let course = app_state.course_service.get(&course_id).await?;
    let record = app_state
        .ledger
        .get_progress(&user.id, &course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Progress"))?;
    Ok(Json(ApiResponse::success(ProgressView::new(record, &course.modules))))
}

/// 管理员查看某个用户的进度
/// GET /api/learn/progress/users/:user_id
pub async fn user_progress(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProgressView>>>> {
    app_state.user_service.require_user(&user_id).await?;
    let records = app_state.ledger.list_progress(&user_id).await?;
    Ok(Json(ApiResponse::success(with_stages(&app_state, records).await?)))
}
