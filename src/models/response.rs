use serde::{Deserialize, Serialize};

use crate::utils::validation::FormErrors;

/// 标准API响应格式
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Body returned when a request was understood but not carried out.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FormErrors>,
}

impl FailureResponse {
    /// 表单校验失败，按字段返回错误
    pub fn validation(details: FormErrors) -> Self {
        Self {
            success: false,
            code: "VALIDATION_ERROR".to_string(),
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    /// 审核链接无效、过期或已处理
    pub fn not_processed() -> Self {
        Self {
            success: false,
            code: "NOT_PROCESSED".to_string(),
            message: "This comment cannot be processed".to_string(),
            details: None,
        }
    }
}
