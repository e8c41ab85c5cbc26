use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        course::{
            Course, CourseChanges, CourseSummary, CreateCourseRequest, CreatePostRequest,
            DiscussionPost, Module, ModuleDraft, QuizQuestion, UpdateCourseRequest,
        },
        user::{User, UserRole},
    },
    services::{notification::NotificationService, store::Store},
    utils::{cache::ProgressCache, locks::KeyedLocks, validation},
};

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn Store>,
    notifications: Arc<NotificationService>,
    cache: ProgressCache,
    // 讨论区整体写回，同一课程的发帖需串行
    discussion_locks: Arc<KeyedLocks<String>>,
    max_post_length: usize,
}

/// 未给出 id 的模块生成新 id；重复 id 视为错误
fn build_modules(drafts: Vec<ModuleDraft>) -> Result<Vec<Module>> {
    let mut modules: Vec<Module> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let id = draft
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("m-{}", Uuid::new_v4()));
        if modules.iter().any(|m| m.id == id) {
            return Err(AppError::Validation(format!("Duplicate module id {}", id)));
        }
        modules.push(Module {
            id,
            title: draft.title.trim().to_string(),
            content: draft.content,
        });
    }
    Ok(modules)
}

fn check_quiz(quiz: &[QuizQuestion]) -> Result<()> {
    for question in quiz {
        if !question.options.iter().any(|o| o == &question.correct_answer) {
            return Err(AppError::Validation(format!(
                "Correct answer for \"{}\" must be one of its options",
                question.question
            )));
        }
    }
    Ok(())
}

/// 按题目顺序比对答案，返回正确率（百分比）
pub fn grade_quiz(quiz: &[QuizQuestion], answers: &[String]) -> Result<f64> {
    if quiz.is_empty() {
        return Err(AppError::bad_request("This course has no quiz"));
    }
    if answers.len() != quiz.len() {
        return Err(AppError::Validation(format!(
            "Expected {} answers, got {}",
            quiz.len(),
            answers.len()
        )));
    }
    let correct = quiz
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct_answer == **a)
        .count();
    Ok(correct as f64 / quiz.len() as f64 * 100.0)
}

impl CourseService {
    pub fn new(
        store: Arc<dyn Store>,
        notifications: Arc<NotificationService>,
        cache: ProgressCache,
        max_post_length: usize,
    ) -> Self {
        Self {
            store,
            notifications,
            cache,
            discussion_locks: Arc::new(KeyedLocks::new()),
            max_post_length,
        }
    }

    pub async fn list(&self) -> Result<Vec<CourseSummary>> {
        let courses = self.store.list_courses().await?;
        Ok(courses.iter().map(CourseSummary::from).collect())
    }

    pub async fn get(&self, course_id: &str) -> Result<Course> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))
    }

    pub async fn create(&self, request: CreateCourseRequest) -> Result<Course> {
        request.validate()?;
        check_quiz(&request.quiz)?;
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description,
            image_url: request.image_url,
            modules: build_modules(request.modules)?,
            quiz: request.quiz,
            reviews: Vec::new(),
            discussion: Vec::new(),
            textbook_url: request.textbook_url,
            textbook_name: request.textbook_name,
            created_at: now,
            updated_at: now,
        };
        let course = self.store.insert_course(&course).await?;
        info!("Created course {} ({})", course.id, course.title);

        let recipients: Vec<User> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.approved && u.role == UserRole::Employee)
            .collect();
        let delivered = self.notifications.announce_course(&course.title, &recipients).await;
        debug!("Announced course {} to {} employee(s)", course.id, delivered);

        Ok(course)
    }

    /// 管理员编辑课程内容，评价与讨论区保持不变
    pub async fn update(&self, course_id: &str, request: UpdateCourseRequest) -> Result<Course> {
        request.validate()?;
        let modules = request.modules.map(build_modules).transpose()?;
        if let Some(quiz) = &request.quiz {
            check_quiz(quiz)?;
        }

        let changes = CourseChanges {
            title: request.title.map(|t| t.trim().to_string()),
            description: request.description,
            image_url: request.image_url,
            modules,
            quiz: request.quiz,
            discussion: None,
            textbook_url: request.textbook_url,
            textbook_name: request.textbook_name,
            updated_at: Some(Utc::now()),
        };
        let course = self.store.update_course(course_id, &changes).await?;
        info!("Updated course {}", course_id);
        Ok(course)
    }

    pub async fn delete(&self, course_id: &str) -> Result<()> {
        if !self.store.delete_course(course_id).await? {
            return Err(AppError::not_found("Course"));
        }
        self.cache.invalidate_where(|(_, cid)| cid == course_id);
        info!("Deleted course {}", course_id);
        Ok(())
    }

    /// 发表主题帖；给出 `parent_id` 时作为回复挂到对应帖子下
    pub async fn post_discussion(
        &self,
        author: &User,
        course_id: &str,
        request: CreatePostRequest,
    ) -> Result<DiscussionPost> {
        request.validate()?;
        validation::validate_text_length(&request.text, "Post", self.max_post_length)?;

        let _guard = self.discussion_locks.lock(course_id.to_string()).await;
        let mut discussion = self.get(course_id).await?.discussion;

        let post = DiscussionPost {
            id: Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            timestamp: Utc::now(),
            text: request.text.trim().to_string(),
            replies: Vec::new(),
        };

        match request.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = DiscussionPost::find_mut(&mut discussion, parent_id)
                    .ok_or_else(|| AppError::not_found("Post"))?;
                parent.replies.push(post.clone());
            }
            None => discussion.push(post.clone()),
        }

        let changes = CourseChanges {
            discussion: Some(discussion),
            ..CourseChanges::default()
        };
        self.store.update_course(course_id, &changes).await?;
        debug!("User {} posted {} on course {}", author.id, post.id, course_id);
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::Review;
    use crate::models::notification::NotificationType;
    use crate::models::progress::ProgressRecord;
    use crate::services::realtime::NotificationHub;
    use crate::services::store::{LedgerEntry, MemoryStore};
    use std::time::Duration;

    fn question(correct: &str) -> QuizQuestion {
        QuizQuestion {
            question: "Pick one".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_answer: correct.to_string(),
        }
    }

    fn service() -> (CourseService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationService::new(store.clone(), NotificationHub::new(16)));
        let cache = ProgressCache::new(Duration::from_secs(60));
        (CourseService::new(store.clone(), notifications, cache, 5000), store)
    }

    fn create_request(title: &str) -> CreateCourseRequest {
        CreateCourseRequest {
            title: title.to_string(),
            description: "About safety".to_string(),
            image_url: String::new(),
            modules: vec![
                ModuleDraft { id: None, title: "Intro".to_string(), content: "...".to_string() },
                ModuleDraft { id: Some("m-2".to_string()), title: "More".to_string(), content: "...".to_string() },
            ],
            quiz: vec![question("a")],
            textbook_url: None,
            textbook_name: None,
        }
    }

    #[test]
    fn test_grade_quiz() {
        let quiz = vec![question("a"), question("b"), question("a"), question("b")];
        let answers: Vec<String> = ["a", "b", "b", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(grade_quiz(&quiz, &answers).unwrap(), 50.0);
        assert!(grade_quiz(&quiz, &answers[..2]).is_err());
        assert!(grade_quiz(&[], &[]).is_err());
    }

    #[tokio::test]
    async fn test_create_generates_module_ids_and_announces() {
        let (service, store) = service();
        let mut employee = User::registered("u1", "Sara", "sara@example.com");
        employee.approved = true;
        store.insert_user(&employee).await.unwrap();
        store
            .insert_user(&User::registered("u2", "Pending", "p@example.com"))
            .await
            .unwrap();

        let course = service.create(create_request("Fire Safety")).await.unwrap();
        assert_eq!(course.modules.len(), 2);
        assert!(course.modules[0].id.starts_with("m-"));
        assert_eq!(course.modules[1].id, "m-2");

        let inbox = store.list_notifications("u1").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::NewCourse);
        assert!(store.list_notifications("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quiz_answer_must_be_an_option() {
        let (service, _) = service();
        let mut request = create_request("Broken");
        request.quiz = vec![question("z")];
        assert!(matches!(service.create(request).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_nested_reply() {
        let (service, store) = service();
        let author = User::registered("u1", "Sara", "sara@example.com");
        let course = service.create(create_request("Ethics")).await.unwrap();

        let root = service
            .post_discussion(&author, &course.id, CreatePostRequest { parent_id: None, text: "Question?".to_string() })
            .await
            .unwrap();
        let reply = service
            .post_discussion(
                &author,
                &course.id,
                CreatePostRequest { parent_id: Some(root.id.clone()), text: "Answer".to_string() },
            )
            .await
            .unwrap();
        service
            .post_discussion(
                &author,
                &course.id,
                CreatePostRequest { parent_id: Some(reply.id.clone()), text: "Thanks".to_string() },
            )
            .await
            .unwrap();

        let stored = store.get_course(&course.id).await.unwrap().unwrap();
        assert_eq!(stored.discussion.len(), 1);
        assert_eq!(stored.discussion[0].replies[0].replies[0].text, "Thanks");

        let missing = service
            .post_discussion(
                &author,
                &course.id,
                CreatePostRequest { parent_id: Some("nope".to_string()), text: "x".to_string() },
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    fn review(author_id: &str, rating: u8) -> Review {
        Review {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            author_name: "Sara".to_string(),
            rating,
            comment: "Clear".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_post_keeps_concurrent_review() {
        let (service, store) = service();
        let author = User::registered("u1", "Sara", "sara@example.com");
        let course = service.create(create_request("Ethics")).await.unwrap();
        store.set_latency(Duration::from_millis(5));

        let poster = {
            let service = service.clone();
            let course_id = course.id.clone();
            tokio::spawn(async move {
                let request = CreatePostRequest { parent_id: None, text: "Question?".to_string() };
                service.post_discussion(&author, &course_id, request).await.unwrap()
            })
        };
        // 评价在发帖读取课程之后提交
        let rating = {
            let store = store.clone();
            let mut entry = LedgerEntry::progress(ProgressRecord::new("u2", &course.id));
            entry.review = Some(review("u2", 5));
            tokio::spawn(async move { store.commit(&entry).await.unwrap() })
        };
        poster.await.unwrap();
        rating.await.unwrap();
        store.set_latency(Duration::ZERO);

        let stored = store.get_course(&course.id).await.unwrap().unwrap();
        assert_eq!(stored.reviews.len(), 1);
        assert_eq!(stored.discussion.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_posts_are_all_kept() {
        let (service, store) = service();
        let course = service.create(create_request("Ethics")).await.unwrap();
        store.set_latency(Duration::from_millis(2));

        let mut handles = Vec::new();
        for i in 0..4 {
            let service = service.clone();
            let course_id = course.id.clone();
            handles.push(tokio::spawn(async move {
                let author = User::registered(&format!("u{}", i), "Sara", "sara@example.com");
                let request = CreatePostRequest { parent_id: None, text: format!("Post {}", i) };
                service.post_discussion(&author, &course_id, request).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        store.set_latency(Duration::ZERO);

        let stored = store.get_course(&course.id).await.unwrap().unwrap();
        assert_eq!(stored.discussion.len(), 4);
        assert!(service.discussion_locks.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_reviews_and_discussion() {
        let (service, store) = service();
        let author = User::registered("u1", "Sara", "sara@example.com");
        let course = service.create(create_request("Ethics")).await.unwrap();
        service
            .post_discussion(&author, &course.id, CreatePostRequest { parent_id: None, text: "Hi".to_string() })
            .await
            .unwrap();
        let mut entry = LedgerEntry::progress(ProgressRecord::new("u1", &course.id));
        entry.review = Some(review("u1", 4));
        store.commit(&entry).await.unwrap();

        let request = UpdateCourseRequest {
            title: Some(" Applied Ethics ".to_string()),
            description: None,
            image_url: None,
            modules: None,
            quiz: None,
            textbook_url: None,
            textbook_name: None,
        };
        let updated = service.update(&course.id, request).await.unwrap();
        assert_eq!(updated.title, "Applied Ethics");
        assert_eq!(updated.modules.len(), 2);
        assert_eq!(updated.reviews.len(), 1);
        assert_eq!(updated.discussion.len(), 1);
        assert!(updated.updated_at >= course.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_course() {
        let (service, _) = service();
        let request = UpdateCourseRequest {
            title: Some("Nothing".to_string()),
            description: None,
            image_url: None,
            modules: None,
            quiz: None,
            textbook_url: None,
            textbook_name: None,
        };
        assert!(matches!(service.update("missing", request).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_course() {
        let (service, _) = service();
        assert!(matches!(service.delete("missing").await, Err(AppError::NotFound(_))));
    }
}
