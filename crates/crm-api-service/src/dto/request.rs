//! 请求 DTO 定义
//!
//! 活动接口的请求体。规则树以原始 JSON 接收，缺失与结构错误
//! 由 handler 分两步报告：先查必填，再交给规则编译器做全量校验。
//! 摄入接口不在这里建模，批量数组在 handler 里逐条校验以保留下标信息。

use serde::Deserialize;
use serde_json::Value;

/// 受众预估请求
#[derive(Debug, Deserialize)]
pub struct PreviewAudienceRequest {
    #[serde(default)]
    pub rules: Option<Value>,
}

/// 创建活动请求
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rules: Option<Value>,
}
