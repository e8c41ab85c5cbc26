use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::utils::serde_helpers::record_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(with = "record_key")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub modules: Vec<Module>,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub discussion: Vec<DiscussionPost>,
    pub textbook_url: Option<String>,
    pub textbook_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn has_module(&self, module_id: &str) -> bool {
        self.modules.iter().any(|m| m.id == module_id)
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
        Some(total as f64 / self.reviews.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Module {
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizQuestion {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub replies: Vec<DiscussionPost>,
}

/// 课程的局部更新，只写入给出的字段
/// 评价只能由账本追加，不在其中
#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<Module>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion: Option<Vec<DiscussionPost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textbook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textbook_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CourseChanges {
    pub fn apply_to(&self, course: &mut Course) {
        if let Some(title) = &self.title {
            course.title = title.clone();
        }
        if let Some(description) = &self.description {
            course.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            course.image_url = image_url.clone();
        }
        if let Some(modules) = &self.modules {
            course.modules = modules.clone();
        }
        if let Some(quiz) = &self.quiz {
            course.quiz = quiz.clone();
        }
        if let Some(discussion) = &self.discussion {
            course.discussion = discussion.clone();
        }
        if let Some(url) = &self.textbook_url {
            course.textbook_url = Some(url.clone());
        }
        if let Some(name) = &self.textbook_name {
            course.textbook_name = Some(name.clone());
        }
        if let Some(updated_at) = self.updated_at {
            course.updated_at = updated_at;
        }
    }
}

impl DiscussionPost {
    /// 深度优先查找回复树中的帖子
    pub fn find_mut<'a>(posts: &'a mut [DiscussionPost], post_id: &str) -> Option<&'a mut DiscussionPost> {
        for post in posts.iter_mut() {
            if post.id == post_id {
                return Some(post);
            }
            if let Some(found) = Self::find_mut(&mut post.replies, post_id) {
                return Some(found);
            }
        }
        None
    }
}

/// 模块草稿：创建课程时 id 可省略
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ModuleDraft {
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[validate]
    pub modules: Vec<ModuleDraft>,
    #[validate]
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    #[validate(url)]
    pub textbook_url: Option<String>,
    pub textbook_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate]
    pub modules: Option<Vec<ModuleDraft>>,
    #[validate]
    pub quiz: Option<Vec<QuizQuestion>>,
    #[validate(url)]
    pub textbook_url: Option<String>,
    pub textbook_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateCourseRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    pub parent_id: Option<String>,
    #[validate(length(min = 1, message = "Post text cannot be empty"))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub module_count: usize,
    pub question_count: usize,
    pub review_count: usize,
    pub average_rating: Option<f64>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            image_url: course.image_url.clone(),
            module_count: course.modules.len(),
            question_count: course.quiz.len(),
            review_count: course.reviews.len(),
            average_rating: course.average_rating(),
        }
    }
}
