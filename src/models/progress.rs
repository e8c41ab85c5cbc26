use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::course::Module;

/// 缓存和锁的键：(用户ID, 课程ID)
pub type ProgressKey = (String, String);

/// 用户在单门课程上的学习进度
/// 存于 `user_progress` 表，记录ID为 `[user_id, course_id]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub course_id: String,
    #[serde(default)]
    pub completed_modules: Vec<String>,
    pub quiz_score: Option<f64>,
    pub rating: Option<u8>,
    pub recently_viewed: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn new(user_id: &str, course_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            completed_modules: Vec::new(),
            quiz_score: None,
            rating: None,
            recently_viewed: None,
            completion_date: None,
        }
    }

    pub fn key(&self) -> ProgressKey {
        (self.user_id.clone(), self.course_id.clone())
    }

    pub fn has_completed_module(&self, module_id: &str) -> bool {
        self.completed_modules.iter().any(|m| m == module_id)
    }

    /// 记录完成的模块，已完成时返回 false
    pub fn complete_module(&mut self, module_id: &str) -> bool {
        if self.has_completed_module(module_id) {
            return false;
        }
        self.completed_modules.push(module_id.to_string());
        true
    }

    /// 课程当前模块中已完成的数量；课程编辑后被移除的模块不计入
    pub fn completed_in(&self, modules: &[Module]) -> usize {
        modules.iter().filter(|m| self.has_completed_module(&m.id)).count()
    }

    pub fn stage(&self, modules: &[Module]) -> ProgressStage {
        if self.completion_date.is_some() {
            ProgressStage::Completed
        } else if self.quiz_score.is_some() {
            ProgressStage::QuizAttempted
        } else if !modules.is_empty() && self.completed_in(modules) == modules.len() {
            ProgressStage::ModulesComplete
        } else if !self.completed_modules.is_empty() {
            ProgressStage::ModulesInProgress
        } else if self.recently_viewed.is_some() {
            ProgressStage::Viewed
        } else {
            ProgressStage::Unstarted
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Unstarted,
    Viewed,
    ModulesInProgress,
    ModulesComplete,
    QuizAttempted,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub stage: ProgressStage,
    pub module_count: usize,
    pub modules_completed: usize,
}

impl ProgressView {
    /// 课程已删除时按 0 个模块计算
    pub fn new(record: ProgressRecord, modules: &[Module]) -> Self {
        Self {
            stage: record.stage(modules),
            module_count: modules.len(),
            modules_completed: record.completed_in(modules),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_module_is_idempotent() {
        let mut record = ProgressRecord::new("user-1", "course-1");
        assert!(record.complete_module("m1-1"));
        assert!(!record.complete_module("m1-1"));
        assert_eq!(record.completed_modules, vec!["m1-1".to_string()]);
    }

    fn modules(ids: &[&str]) -> Vec<Module> {
        ids.iter()
            .map(|id| Module {
                id: id.to_string(),
                title: id.to_string(),
                content: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_stage_progression() {
        let course_modules = modules(&["m1", "m2"]);
        let mut record = ProgressRecord::new("user-1", "course-1");
        assert_eq!(record.stage(&course_modules), ProgressStage::Unstarted);

        record.recently_viewed = Some(Utc::now());
        assert_eq!(record.stage(&course_modules), ProgressStage::Viewed);

        record.complete_module("m1");
        assert_eq!(record.stage(&course_modules), ProgressStage::ModulesInProgress);

        record.complete_module("m2");
        assert_eq!(record.stage(&course_modules), ProgressStage::ModulesComplete);

        record.quiz_score = Some(50.0);
        assert_eq!(record.stage(&course_modules), ProgressStage::QuizAttempted);

        record.completion_date = Some(Utc::now());
        assert_eq!(record.stage(&course_modules), ProgressStage::Completed);
    }

    #[test]
    fn test_removed_modules_do_not_count() {
        let mut record = ProgressRecord::new("user-1", "course-1");
        record.complete_module("old-1");
        record.complete_module("old-2");

        // 管理员把课程模块换成 m1、m2 之后
        let course_modules = modules(&["m1", "m2"]);
        assert_eq!(record.completed_in(&course_modules), 0);
        assert_eq!(record.stage(&course_modules), ProgressStage::ModulesInProgress);

        record.complete_module("m1");
        let view = ProgressView::new(record.clone(), &course_modules);
        assert_eq!(view.modules_completed, 1);
        assert_eq!(view.stage, ProgressStage::ModulesInProgress);

        record.complete_module("m2");
        assert_eq!(record.stage(&course_modules), ProgressStage::ModulesComplete);
        assert_eq!(ProgressView::new(record, &[]).stage, ProgressStage::ModulesInProgress);
    }
}
