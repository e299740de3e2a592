//! 响应 DTO 定义
//!
//! 所有 REST API 共用一个信封结构，业务数据放在 `data` 字段里。

use serde::{Deserialize, Serialize};

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 创建已受理响应
    ///
    /// 异步接口（摄入、活动创建）在消息入队后返回，处理结果稍后可查。
    pub fn accepted(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "ACCEPTED".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 受众预估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudiencePreview {
    pub count: u64,
}

/// 摄入批次受理回执
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAccepted {
    pub batch_id: String,
    pub record_count: usize,
}
