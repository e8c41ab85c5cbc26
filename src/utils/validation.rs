use crate::error::{AppError, Result};

/// 验证邮箱并返回详细错误信息
pub fn validate_email_format(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AppError::validation("Email cannot be empty"));
    }

    if !validator::validate_email(email) {
        return Err(AppError::validation("Invalid email format"));
    }

    // 检查邮箱长度
    if email.len() > 254 {
        return Err(AppError::validation("Email address is too long"));
    }

    Ok(())
}

/// 验证显示名称格式
pub fn validate_display_name(display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }

    if display_name.chars().count() > 100 {
        return Err(AppError::validation("Name cannot exceed 100 characters"));
    }

    Ok(())
}

/// 按字符数校验评论、帖子等自由文本
pub fn validate_text_length(text: &str, label: &str, max: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", label)));
    }
    if text.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {} characters",
            label, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_format() {
        // 有效邮箱
        assert!(validate_email_format("user@example.com").is_ok());
        assert!(validate_email_format("test.email+tag@domain.co.uk").is_ok());

        // 无效邮箱
        assert!(validate_email_format("").is_err());
        assert!(validate_email_format("invalid-email").is_err());
        assert!(validate_email_format("user@").is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Aisha Ahmed").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_text_length_counts_chars() {
        assert!(validate_text_length("مرحبا", "Post", 5).is_ok());
        assert!(validate_text_length("مرحبا!", "Post", 5).is_err());
        assert!(validate_text_length("", "Post", 5).is_err());
    }
}
