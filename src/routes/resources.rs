use crate::{
    error::Result,
    models::{
        resource::{CreateResourceRequest, ExternalResource},
        response::ApiResponse,
        toast::Toast,
    },
    services::auth::{AdminUser, CurrentUser},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_resources).post(create_resource))
        .route("/:id", delete(delete_resource))
}

/// 获取资源列表
/// GET /api/learn/resources
pub async fn list_resources(
    State(app_state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<ExternalResource>>>> {
    let resources = app_state.resource_service.list().await?;
    Ok(Json(ApiResponse::success(resources)))
}

/// 添加资源
/// POST /api/learn/resources
pub async fn create_resource(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(request): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExternalResource>>)> {
    let resource = app_state.resource_service.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_toast(resource, Toast::success("Resource added."))),
    ))
}

/// 删除资源
/// DELETE /api/learn/resources/:id
pub async fn delete_resource(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(resource_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    app_state.resource_service.delete(&resource_id).await?;
    Ok(Json(ApiResponse::with_toast((), Toast::success("Resource deleted."))))
}
