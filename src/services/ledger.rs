//! 学习进度与奖励账本
//!
//! 每个操作经缓存读取当前进度，算出全部写入后作为一个 [`LedgerEntry`]
//! 交给存储。存储确认之后才更新缓存并推送实时通知。

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        badge::{self, BadgeContext, BadgeDefinition},
        certificate::Certificate,
        course::{Course, Review},
        notification::{Notification, NotificationType},
        progress::{ProgressKey, ProgressRecord},
        toast::Toast,
        user::User,
    },
    services::{
        notification::NotificationService,
        store::{Credit, LedgerEntry, Store},
    },
    utils::{
        cache::{progress_key, ProgressCache},
        locks::KeyedLocks,
    },
};

pub const MODULE_POINTS: u32 = 10;
pub const COMPLETION_POINTS: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ModuleCompletion {
    pub progress: ProgressRecord,
    pub points_awarded: u32,
    /// 入账后的总积分，未入账时为 `None`
    pub total_points: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizCompletion {
    pub progress: ProgressRecord,
    pub first_completion: bool,
    pub points_awarded: u32,
    pub badges: Vec<BadgeDefinition>,
    pub certificate: Certificate,
    pub total_points: i64,
    #[serde(skip)]
    pub toasts: Vec<Toast>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingOutcome {
    pub progress: ProgressRecord,
    pub review: Review,
    #[serde(skip)]
    pub toast: Toast,
}

pub struct ProgressLedger {
    store: Arc<dyn Store>,
    cache: ProgressCache,
    notifications: Arc<NotificationService>,
    progress_locks: KeyedLocks<ProgressKey>,
    // 徽章评估读取用户的全部进度，同一用户的评估必须串行
    user_locks: KeyedLocks<String>,
    max_review_length: usize,
}

impl ProgressLedger {
    pub fn new(
        store: Arc<dyn Store>,
        cache: ProgressCache,
        notifications: Arc<NotificationService>,
        max_review_length: usize,
    ) -> Self {
        Self {
            store,
            cache,
            notifications,
            progress_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            max_review_length,
        }
    }

    /// 先查缓存，未命中再回源
    pub async fn get_progress(&self, user_id: &str, course_id: &str) -> Result<Option<ProgressRecord>> {
        let key = progress_key(user_id, course_id);
        if let Some(record) = self.cache.get(&key) {
            return Ok(Some(record));
        }
        let record = self.store.get_progress(user_id, course_id).await?;
        if let Some(record) = &record {
            self.cache.set(key, record.clone());
        }
        Ok(record)
    }

    pub async fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        let records = self.store.list_progress(user_id).await?;
        for record in &records {
            self.cache.set(record.key(), record.clone());
        }
        Ok(records)
    }

    pub async fn record_view(&self, user_id: &str, course_id: &str) -> Result<ProgressRecord> {
        debug!("Recording view of course {} by user {}", course_id, user_id);
        self.require_course(course_id).await?;

        let _guard = self.progress_locks.lock(progress_key(user_id, course_id)).await;

        let mut record = self.load_or_new(user_id, course_id).await?;
        record.recently_viewed = Some(Utc::now());
        self.commit(LedgerEntry::progress(record.clone())).await?;
        Ok(record)
    }

    pub async fn record_module_completion(
        &self,
        user_id: &str,
        course_id: &str,
        module_id: &str,
    ) -> Result<ModuleCompletion> {
        debug!("Recording module {} of course {} for user {}", module_id, course_id, user_id);
        let course = self.require_course(course_id).await?;
        if !course.has_module(module_id) {
            return Err(AppError::Validation(format!(
                "Module {} does not belong to course {}",
                module_id, course_id
            )));
        }
        self.require_user(user_id).await?;

        let _guard = self.progress_locks.lock(progress_key(user_id, course_id)).await;

        let mut record = self.load_or_new(user_id, course_id).await?;
        if !record.complete_module(module_id) {
            debug!("Module {} already completed by user {}", module_id, user_id);
            return Ok(ModuleCompletion {
                progress: record,
                points_awarded: 0,
                total_points: None,
            });
        }

        let mut entry = LedgerEntry::progress(record.clone());
        entry.credit = Some(Credit {
            user_id: user_id.to_string(),
            points: MODULE_POINTS,
            badges: Vec::new(),
        });
        let user = self.commit(entry).await?;

        info!("User {} completed module {} (+{} points)", user_id, module_id, MODULE_POINTS);
        Ok(ModuleCompletion {
            progress: record,
            points_awarded: MODULE_POINTS,
            total_points: user.map(|u| u.points),
        })
    }

    pub async fn record_quiz_completion(
        &self,
        user_id: &str,
        course_id: &str,
        score: f64,
    ) -> Result<QuizCompletion> {
        debug!("Recording quiz score {} on course {} for user {}", score, course_id, user_id);
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(AppError::validation("Quiz score must be between 0 and 100"));
        }
        let course = self.require_course(course_id).await?;

        // 加锁顺序：先用户后进度，其他操作只持有进度锁
        let _user_guard = self.user_locks.lock(user_id.to_string()).await;
        let _guard = self.progress_locks.lock(progress_key(user_id, course_id)).await;
        let user = self.require_user(user_id).await?;

        let mut record = self.load_or_new(user_id, course_id).await?;
        let first_completion = record.quiz_score.is_none();
        let now = Utc::now();
        record.quiz_score = Some(score);
        if first_completion {
            record.completion_date = Some(now);
        }

        // 已完成课程数：其他已有成绩的课程 + 本课程，重考不重复计数
        let completed_elsewhere = self
            .store
            .list_progress(user_id)
            .await?
            .iter()
            .filter(|p| p.course_id != course_id && p.quiz_score.is_some())
            .count();
        let catalog_size = self.store.count_courses().await?;
        let ctx = BadgeContext {
            completed_count: completed_elsewhere + 1,
            score,
            catalog_size,
            held_badges: &user.badges,
        };
        let earned = badge::evaluate(&ctx);

        let mut points = 0;
        let mut notifications = Vec::new();
        let mut toasts = Vec::new();
        if first_completion {
            points += COMPLETION_POINTS;
            notifications.push(Notification::new(
                user_id,
                NotificationType::Certificate,
                format!("Congratulations! You earned a certificate for \"{}\".", course.title),
            ));
        }
        for badge in &earned {
            points += badge.points;
            notifications.push(Notification::new(
                user_id,
                NotificationType::Badge,
                format!("You earned the \"{}\" badge and {} points!", badge.name, badge.points),
            ));
            toasts.push(Toast::success(format!("Badge Unlocked: {}!", badge.name)));
        }

        let mut entry = LedgerEntry::progress(record.clone());
        if points > 0 || !earned.is_empty() {
            entry.credit = Some(Credit {
                user_id: user_id.to_string(),
                points,
                badges: earned.iter().map(|b| b.id.to_string()).collect(),
            });
        }
        entry.notifications = notifications;

        let credited = self.commit(entry).await?;
        let total_points = credited.map(|u| u.points).unwrap_or(user.points);

        info!(
            "User {} completed quiz for course {} (score {}, first: {}, +{} points, {} badge(s))",
            user_id,
            course_id,
            score,
            first_completion,
            points,
            earned.len()
        );

        let certificate = Certificate::new(
            course_id,
            &user.name,
            &course.title,
            record.completion_date.unwrap_or(now),
        );

        Ok(QuizCompletion {
            progress: record,
            first_completion,
            points_awarded: points,
            badges: earned.into_iter().cloned().collect(),
            certificate,
            total_points,
            toasts,
        })
    }

    pub async fn record_rating(
        &self,
        user_id: &str,
        course_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<RatingOutcome> {
        debug!("Recording rating {} on course {} by user {}", rating, course_id, user_id);
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        if comment.chars().count() > self.max_review_length {
            return Err(AppError::Validation(format!(
                "Review cannot exceed {} characters",
                self.max_review_length
            )));
        }
        self.require_course(course_id).await?;
        let user = self.require_user(user_id).await?;

        let _guard = self.progress_locks.lock(progress_key(user_id, course_id)).await;

        let mut record = self.load_or_new(user_id, course_id).await?;
        record.rating = Some(rating);

        let review = Review {
            id: Uuid::new_v4().to_string(),
            author_id: user.id.clone(),
            author_name: user.name.clone(),
            rating,
            comment: comment.trim().to_string(),
            timestamp: Utc::now(),
        };

        let mut entry = LedgerEntry::progress(record.clone());
        entry.review = Some(review.clone());
        self.commit(entry).await?;

        info!("User {} rated course {} with {}", user_id, course_id, rating);
        Ok(RatingOutcome {
            progress: record,
            review,
            toast: Toast::success("Thank you for your review!"),
        })
    }

    /// 积分只增不减
    pub async fn award_points(&self, user_id: &str, points: u32) -> Result<User> {
        self.require_user(user_id).await?;
        let user = self
            .store
            .credit_user(&Credit {
                user_id: user_id.to_string(),
                points,
                badges: Vec::new(),
            })
            .await?;
        info!("Awarded {} points to user {} (total {})", points, user_id, user.points);
        Ok(user)
    }

    /// 已完成课程的证书，日期为首次完成时间
    pub async fn certificate(&self, user: &User, course_id: &str) -> Result<Certificate> {
        let course = self.require_course(course_id).await?;
        let record = self
            .get_progress(&user.id, course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Certificate"))?;
        let completed_at = record
            .completion_date
            .ok_or_else(|| AppError::not_found("Certificate"))?;
        Ok(Certificate::new(course_id, &user.name, &course.title, completed_at))
    }

    async fn commit(&self, entry: LedgerEntry) -> Result<Option<User>> {
        let key = entry.progress.key();
        match self.store.commit(&entry).await {
            Ok(user) => {
                self.cache.set(key, entry.progress.clone());
                self.notifications.publish_all(&entry.notifications);
                Ok(user)
            }
            Err(e) => {
                // 写入失败：丢弃缓存，下次读取回源
                self.cache.invalidate(&key);
                error!(
                    "Ledger commit failed for user {} course {}: {}",
                    entry.progress.user_id, entry.progress.course_id, e
                );
                Err(e)
            }
        }
    }

    async fn load_or_new(&self, user_id: &str, course_id: &str) -> Result<ProgressRecord> {
        Ok(self
            .get_progress(user_id, course_id)
            .await?
            .unwrap_or_else(|| ProgressRecord::new(user_id, course_id)))
    }

    async fn require_course(&self, course_id: &str) -> Result<Course> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::not_found("Course"))
    }

    async fn require_user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}
