use serde::{Deserialize, Serialize};

use crate::models::toast::Toast;

/// 标准API响应格式
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toasts: Vec<Toast>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            toasts: Vec::new(),
        }
    }

    pub fn with_toasts(data: T, toasts: Vec<Toast>) -> Self {
        Self {
            success: true,
            data,
            toasts,
        }
    }

    pub fn with_toast(data: T, toast: Toast) -> Self {
        Self::with_toasts(data, vec![toast])
    }
}
