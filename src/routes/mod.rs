pub mod users;
pub mod courses;
pub mod progress;
pub mod notifications;
pub mod resources;
pub mod websocket;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    error::Result,
    state::AppState,
    utils::middleware::{auth_middleware, rate_limit_middleware, request_logging_middleware},
};

/// 构建应用路由 - 使用 /api/learn/ 前缀避免网关路由冲突
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/users", users::router())
        .nest("/courses", courses::router())
        .nest("/progress", progress::router())
        .nest("/notifications", notifications::router())
        .nest("/resources", resources::router())
        .nest("/ws", websocket::router())
        .layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_middleware));

    Router::new()
        .nest("/api/learn", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&app_state.config.cors_allowed_origins)),
        )
        .with_state(app_state)
}

/// 配置 CORS，忽略无法解析的来源
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origins)
}

/// 健康检查
/// GET /api/learn/health
async fn health_check(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let courses = app_state.store.count_courses().await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "courses": courses,
            "realtime_subscribers": app_state.notification_service.hub().subscriber_count(),
        }
    })))
}
