//! 营销活动 API 处理器
//!
//! 受众预估、活动创建与活动历史。创建接口返回排队中的工单，
//! 真实的发送结果由投递消费端写入沟通日志后通过历史接口可见。

use axum::{Json, extract::State, http::StatusCode};
use serde_json::Value;

use audience_rules::RuleGroup;
use crm_store::{CampaignTicket, CommunicationLog};

use crate::{
    dto::{ApiResponse, AudiencePreview, CreateCampaignRequest, PreviewAudienceRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 预估受众人数
///
/// POST /api/campaigns/preview
pub async fn preview_audience(
    State(state): State<AppState>,
    Json(req): Json<PreviewAudienceRequest>,
) -> Result<Json<ApiResponse<AudiencePreview>>> {
    let rules = parse_rules(req.rules)?;

    let count = state.dispatcher.preview(&rules).await?;

    Ok(Json(ApiResponse::success(AudiencePreview { count })))
}

/// 创建活动
///
/// POST /api/campaigns/create
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignTicket>>)> {
    let name = require_name(req.name)?;
    let rules = parse_rules(req.rules)?;

    let ticket = state.dispatcher.create_campaign(&name, rules).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::accepted(ticket, "活动已受理，投递进行中")),
    ))
}

/// 活动历史
///
/// GET /api/campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CommunicationLog>>>> {
    let logs = state.logs.list_recent().await?;

    Ok(Json(ApiResponse::success(logs)))
}

/// 活动名称必填且不能为空串
fn require_name(name: Option<String>) -> Result<String> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::Validation("活动名称不能为空".to_string())),
    }
}

/// 把原始 JSON 解析成规则树
///
/// 顶层结构错误在这里拦下；树内部的字段、操作符、值的问题
/// 由编译器全量收集后以明细列表返回。
fn parse_rules(raw: Option<Value>) -> Result<RuleGroup> {
    let raw = raw.ok_or_else(|| ApiError::Validation("活动规则不能为空".to_string()))?;

    serde_json::from_value(raw).map_err(|_| {
        ApiError::Validation("规则结构无效: 顶层必须包含 combinator 与 rules 数组".to_string())
    })
}
