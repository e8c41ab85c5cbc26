use axum::{
    body::{Body, HttpBody},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use rainbow_learn::{
    config::Config,
    models::user::{User, UserRole},
    routes::build_router,
    services::store::{MemoryStore, Store},
    state::AppState,
};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    admin_token: String,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(Config::default(), store));

        let mut admin = User::registered("admin-1", "Admin", "admin@corp.example");
        admin.role = UserRole::Admin;
        admin.approved = true;
        state.store.insert_user(&admin).await.unwrap();

        let admin_token = token_for(&state, "admin-1", "admin@corp.example");
        Self {
            router: build_router(state.clone()),
            state,
            admin_token,
        }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let mut body = response.into_body();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// 注册并由管理员审核通过一名员工
    async fn approved_employee(&self, user_id: &str, email: &str) -> String {
        let token = token_for(&self.state, user_id, email);
        let (status, _) = self
            .send(
                "POST",
                "/api/learn/users/register",
                Some(&token),
                Some(json!({ "name": "Dana Employee", "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = self
            .send(
                "POST",
                &format!("/api/learn/users/{}/approve", user_id),
                Some(&self.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        token
    }

    async fn create_course(&self) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/learn/courses",
                Some(&self.admin_token),
                Some(json!({
                    "title": "Secure Coding",
                    "description": "Writing code that survives review",
                    "modules": [{ "title": "Input handling", "content": "Validate everything" }],
                    "quiz": [
                        { "question": "Trust user input?", "options": ["Yes", "No"], "correct_answer": "No" },
                        { "question": "Log secrets?", "options": ["Yes", "No"], "correct_answer": "No" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }
}

fn token_for(state: &AppState, user_id: &str, email: &str) -> String {
    state
        .auth_service
        .issue_token(user_id, Some(email), chrono::Duration::hours(1))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/api/learn/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["courses"], 0);
}

#[tokio::test]
async fn test_pending_account_is_gated_until_approved() {
    let app = TestApp::new().await;
    let token = token_for(&app.state, "emp-1", "dana@corp.example");

    let (status, body) = app.send("GET", "/api/learn/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .send(
            "POST",
            "/api/learn/users/register",
            Some(&token),
            Some(json!({ "name": "Dana", "email": "Dana@Corp.Example" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "dana@corp.example");
    assert_eq!(body["data"]["approved"], false);

    let (status, body) = app.send("GET", "/api/learn/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["toasts"][0]["type"], "error");
    assert_eq!(body["toasts"][0]["message"], "Your account is pending approval.");

    let (status, _) = app
        .send("POST", "/api/learn/users/emp-1/approve", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("POST", "/api/learn/users/emp-1/approve", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("GET", "/api/learn/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approved"], true);
}

#[tokio::test]
async fn test_learning_flow_awards_points_badges_and_certificate() {
    let app = TestApp::new().await;
    let course = app.create_course().await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let module_id = course["modules"][0]["id"].as_str().unwrap().to_string();
    let token = app.approved_employee("emp-2", "lee@corp.example").await;

    let (status, body) = app
        .send("POST", &format!("/api/learn/courses/{}/view", course_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["course_id"], course_id.as_str());

    let uri = format!("/api/learn/courses/{}/modules/{}/complete", course_id, module_id);
    let (status, body) = app.send("POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["points_awarded"], 10);

    let (_, body) = app.send("POST", &uri, Some(&token), None).await;
    assert_eq!(body["data"]["points_awarded"], 0);

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/learn/courses/{}/certificate", course_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/learn/courses/{}/quiz", course_id),
            Some(&token),
            Some(json!({ "answers": ["No", "No"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // 100 完成 + 25 first-course + 50 quiz-master + 150 completionist（目录中只有一门课）
    assert_eq!(body["data"]["first_completion"], true);
    assert_eq!(body["data"]["points_awarded"], 325);
    assert_eq!(body["data"]["total_points"], 335);
    assert_eq!(body["data"]["certificate"]["course_name"], "Secure Coding");
    assert_eq!(body["toasts"].as_array().unwrap().len(), 3);

    // 重考不再发放奖励，但仍返回证书
    let (_, body) = app
        .send(
            "POST",
            &format!("/api/learn/courses/{}/quiz", course_id),
            Some(&token),
            Some(json!({ "answers": ["Yes", "No"] })),
        )
        .await;
    assert_eq!(body["data"]["first_completion"], false);
    assert_eq!(body["data"]["points_awarded"], 0);
    assert_eq!(body["data"]["progress"]["quiz_score"], 50.0);
    assert!(body.get("toasts").is_none());

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/learn/courses/{}/certificate", course_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["employee_name"], "Dana Employee");

    let (_, body) = app.send("GET", "/api/learn/notifications", Some(&token), None).await;
    let types: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["type"].as_str())
        .collect();
    assert_eq!(types.iter().filter(|t| **t == "certificate").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "badge").count(), 3);
    assert!(types.contains(&"approval"));

    let (_, body) = app.send("GET", "/api/learn/users/leaderboard", Some(&token), None).await;
    assert_eq!(body["data"][0]["user_id"], "emp-2");
    assert_eq!(body["data"][0]["points"], 335);
}

#[tokio::test]
async fn test_rating_validation_and_review() {
    let app = TestApp::new().await;
    let course = app.create_course().await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let token = app.approved_employee("emp-3", "sam@corp.example").await;
    let uri = format!("/api/learn/courses/{}/rating", course_id);

    let (status, body) = app
        .send("POST", &uri, Some(&token), Some(json!({ "rating": 6, "comment": "Too good" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["toasts"][0]["type"], "error");

    let (status, body) = app
        .send("POST", &uri, Some(&token), Some(json!({ "rating": 4, "comment": "Useful" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["review"]["rating"], 4);
    assert_eq!(body["toasts"][0]["message"], "Thank you for your review!");

    let (_, body) = app
        .send("GET", &format!("/api/learn/courses/{}", course_id), Some(&token), None)
        .await;
    assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_course_and_admin_only_routes() {
    let app = TestApp::new().await;
    let token = app.approved_employee("emp-4", "kim@corp.example").await;

    let (status, body) = app
        .send("GET", "/api/learn/courses/does-not-exist", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Course not found");

    let (status, _) = app
        .send(
            "POST",
            "/api/learn/courses",
            Some(&token),
            Some(json!({ "title": "Sneaky", "description": "", "modules": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            "POST",
            "/api/learn/users/emp-4/points",
            Some(&app.admin_token),
            Some(json!({ "points": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["points"], 40);
}
