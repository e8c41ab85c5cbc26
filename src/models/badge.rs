use serde::Serialize;

pub const FIRST_COURSE: &str = "first-course";
pub const PROLIFIC_LEARNER: &str = "prolific-learner";
pub const QUIZ_MASTER: &str = "quiz-master";
pub const COMPLETIONIST: &str = "completionist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub points: u32,
}

/// 完成测验时徽章规则可见的上下文
#[derive(Debug, Clone)]
pub struct BadgeContext<'a> {
    /// 已有测验成绩的课程数，包含刚完成的这门
    pub completed_count: usize,
    pub score: f64,
    pub catalog_size: usize,
    pub held_badges: &'a [String],
}

pub struct BadgeRule {
    pub badge: BadgeDefinition,
    pub qualifies: fn(&BadgeContext<'_>) -> bool,
}

fn first_course(ctx: &BadgeContext<'_>) -> bool {
    ctx.completed_count >= 1
}

fn prolific_learner(ctx: &BadgeContext<'_>) -> bool {
    ctx.completed_count >= 3
}

fn quiz_master(ctx: &BadgeContext<'_>) -> bool {
    ctx.score >= 100.0
}

fn completionist(ctx: &BadgeContext<'_>) -> bool {
    ctx.completed_count == ctx.catalog_size
}

pub static BADGE_RULES: [BadgeRule; 4] = [
    BadgeRule {
        badge: BadgeDefinition {
            id: FIRST_COURSE,
            name: "First Step",
            description: "Completed your first course.",
            points: 25,
        },
        qualifies: first_course,
    },
    BadgeRule {
        badge: BadgeDefinition {
            id: PROLIFIC_LEARNER,
            name: "Prolific Learner",
            description: "Completed 3 courses.",
            points: 75,
        },
        qualifies: prolific_learner,
    },
    BadgeRule {
        badge: BadgeDefinition {
            id: QUIZ_MASTER,
            name: "Quiz Master",
            description: "Achieved a perfect score (100%) on a quiz.",
            points: 50,
        },
        qualifies: quiz_master,
    },
    BadgeRule {
        badge: BadgeDefinition {
            id: COMPLETIONIST,
            name: "Completionist",
            description: "Completed all available courses.",
            points: 150,
        },
        qualifies: completionist,
    },
];

/// 遍历规则表一次，已持有的徽章不再授予
pub fn evaluate(ctx: &BadgeContext<'_>) -> Vec<&'static BadgeDefinition> {
    BADGE_RULES
        .iter()
        .filter(|rule| !ctx.held_badges.iter().any(|held| held == rule.badge.id))
        .filter(|rule| (rule.qualifies)(ctx))
        .map(|rule| &rule.badge)
        .collect()
}
