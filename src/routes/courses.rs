use crate::{
    error::Result,
    models::{
        certificate::Certificate,
        course::*,
        progress::ProgressRecord,
        response::ApiResponse,
        toast::Toast,
    },
    services::{
        auth::{AdminUser, CurrentUser},
        course::grade_quiz,
        ledger::{ModuleCompletion, QuizCompletion, RatingOutcome},
    },
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:id", get(get_course).put(update_course).delete(delete_course))

        // 学习进度
        .route("/:id/view", post(record_view))
        .route("/:id/modules/:module_id/complete", post(complete_module))
        .route("/:id/quiz", post(submit_quiz))
        .route("/:id/rating", post(rate_course))
        .route("/:id/certificate", get(get_certificate))

        // 讨论区
        .route("/:id/discussion", post(post_discussion))
}

/// 获取课程列表
/// GET /api/learn/courses
pub async fn list_courses(
    State(app_state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<CourseSummary>>>> {
    let courses = app_state.course_service.list().await?;
    Ok(Json(ApiResponse::success(courses)))
}

/// 课程被删除时返回 404
/// GET /api/learn/courses/:id
pub async fn get_course(
    State(app_state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<Course>>> {
    let course = app_state.course_service.get(&course_id).await?;
    Ok(Json(ApiResponse::success(course)))
}

/// 创建课程
/// POST /api/learn/courses
pub async fn create_course(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Course>>)> {
    let course = app_state.course_service.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_toast(course, Toast::success("Course created successfully."))),
    ))
}

/// 更新课程
/// PUT /api/learn/courses/:id
pub async fn update_course(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(course_id): Path<String>,
    Json(request): Json<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<Course>>> {
    let course = app_state.course_service.update(&course_id, request).await?;
    Ok(Json(ApiResponse::with_toast(course, Toast::success("Course updated successfully."))))
}

/// 删除课程
/// DELETE /api/learn/courses/:id
pub async fn delete_course(
    State(app_state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    app_state.course_service.delete(&course_id).await?;
    Ok(Json(ApiResponse::with_toast((), Toast::success("Course deleted successfully."))))
}

/// 记录浏览
/// POST /api/learn/courses/:id/view
pub async fn record_view(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<ProgressRecord>>> {
    let progress = app_state.ledger.record_view(&user.id, &course_id).await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// 完成模块
/// POST /api/learn/courses/:id/modules/:module_id/complete
pub async fn complete_module(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((course_id, module_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ModuleCompletion>>> {
    let outcome = app_state
        .ledger
        .record_module_completion(&user.id, &course_id, &module_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 提交答案，评分后记入账本
/// POST /api/learn/courses/:id/quiz
pub async fn submit_quiz(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    Json(request): Json<SubmitQuizRequest>,
) -> Result<Json<ApiResponse<QuizCompletion>>> {
    let course = app_state.course_service.get(&course_id).await?;
    let score = grade_quiz(&course.quiz, &request.answers)?;
    debug!("User {} scored {} on course {}", user.id, score, course_id);

    let mut outcome = app_state
        .ledger
        .record_quiz_completion(&user.id, &course_id, score)
        .await?;
    let toasts = std::mem::take(&mut outcome.toasts);
    Ok(Json(ApiResponse::with_toasts(outcome, toasts)))
}

/// 评分并留下评价
/// POST /api/learn/courses/:id/rating
pub async fn rate_course(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    Json(request): Json<RateCourseRequest>,
) -> Result<Json<ApiResponse<RatingOutcome>>> {
    request.validate()?;
    let outcome = app_state
        .ledger
        .record_rating(&user.id, &course_id, request.rating, &request.comment)
        .await?;
    let toast = outcome.toast.clone();
    Ok(Json(ApiResponse::with_toast(outcome, toast)))
}

/// 获取结业证书
/// GET /api/learn/courses/:id/certificate
pub async fn get_certificate(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<Certificate>>> {
    let certificate = app_state.ledger.certificate(&user, &course_id).await?;
    Ok(Json(ApiResponse::success(certificate)))
}

/// 发表讨论或回复
/// POST /api/learn/courses/:id/discussion
pub async fn post_discussion(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DiscussionPost>>)> {
    let post = app_state
        .course_service
        .post_discussion(&user, &course_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(post))))
}
