use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// 证书视图，不落库，由已完成的进度记录生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub course_id: String,
    pub employee_name: String,
    pub course_name: String,
    pub completion_date: String,
}

impl Certificate {
    pub fn new(course_id: &str, employee_name: &str, course_name: &str, completed_at: DateTime<Utc>) -> Self {
        Self {
            course_id: course_id.to_string(),
            employee_name: employee_name.to_string(),
            course_name: course_name.to_string(),
            completion_date: format_completion_date(completed_at),
        }
    }
}

/// 形如 "October 18, 2026"
pub fn format_completion_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_completion_date_format() {
        let date = Utc.with_ymd_and_hms(2026, 3, 7, 15, 30, 0).unwrap();
        assert_eq!(format_completion_date(date), "March 7, 2026");
    }
}
