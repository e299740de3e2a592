//! API 服务错误类型定义
//!
//! 所有 handler 返回 `Result<_, ApiError>`，由 `IntoResponse` 统一转换为
//! 信封格式的 JSON 错误响应。校验类错误把明细列表放进 `data.errors`，
//! 依赖故障只记日志、对外返回通用提示。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use audience_rules::RuleValidationError;
use crm_shared::error::CrmError;

/// 批量摄入中单条记录的校验问题
///
/// `index` 指向请求数组中的位置，让调用方能定位到具体哪条记录不合法。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    pub index: usize,
    pub message: String,
}

impl RecordIssue {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// API 服务错误类型
#[derive(Debug, Error)]
pub enum ApiError {
    // ==================== 请求校验错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    RuleValidation(#[from] RuleValidationError),

    #[error("数据校验失败: {} 条记录不合法", .0.len())]
    RecordValidation(Vec<RecordIssue>),

    // ==================== 资源错误 ====================
    #[error("{entity}不存在: {id}")]
    NotFound { entity: &'static str, id: String },

    // ==================== 认证错误 ====================
    #[error("未授权: {0}")]
    Unauthorized(String),

    // ==================== 依赖错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("消息队列错误: {0}")]
    Queue(String),

    // ==================== 系统错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// API 服务 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::RuleValidation(_) | Self::RecordValidation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Queue(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取业务错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::RuleValidation(_) | Self::RecordValidation(_) => {
                "VALIDATION_ERROR"
            }
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Database(_) | Self::Queue(_) => "DEPENDENCY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // 依赖与内部错误的细节只进日志，避免暴露连接串、SQL 等敏感信息
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务暂时不可用，请稍后重试".to_string()
            }
            Self::Queue(detail) => {
                tracing::error!(detail, "消息队列操作失败");
                "服务暂时不可用，请稍后重试".to_string()
            }
            Self::Internal(detail) => {
                tracing::error!(detail, "服务内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        // 校验类错误带上结构化明细，调用方可以逐条修复
        let data = match &self {
            Self::RuleValidation(err) => json!({ "errors": err.issues }),
            Self::RecordValidation(issues) => json!({ "errors": issues }),
            _ => Value::Null,
        };

        let body = json!({
            "success": false,
            "code": code,
            "message": message,
            "data": data,
        });

        (status, Json(body)).into_response()
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::Database(e) => Self::Database(e),
            CrmError::Kafka(detail) => Self::Queue(detail),
            CrmError::Validation(detail) => Self::Validation(detail),
            CrmError::NotFound { entity, id } => Self::Internal(format!("{entity} 未找到: {id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}
