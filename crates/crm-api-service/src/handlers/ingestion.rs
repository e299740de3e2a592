//! 数据摄入 API 处理器
//!
//! 客户与订单批量摄入。请求体是 JSON 数组，逐条做闭合模式校验并收集
//! 全部问题：任意一条不合法则整批拒绝，否则原始数组一次性入队，
//! 落库由摄入消费端异步完成。

use axum::{Json, extract::State, http::StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crm_shared::kafka::topics;
use crm_store::{CustomerRecord, OrderRecord};

use crate::{
    dto::{ApiResponse, IngestAccepted},
    error::{ApiError, RecordIssue, Result},
    state::AppState,
};

/// 批量摄入客户数据
///
/// POST /api/ingestion/customers
pub async fn ingest_customers(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<IngestAccepted>>)> {
    let records = expect_batch(&body)?;

    let issues = validate_batch::<CustomerRecord>(records);
    if !issues.is_empty() {
        return Err(ApiError::RecordValidation(issues));
    }

    accept_batch(
        &state,
        &body,
        records.len(),
        "customers",
        "客户数据已接收，进入处理队列",
    )
    .await
}

/// 批量摄入订单数据
///
/// POST /api/ingestion/orders
pub async fn ingest_orders(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<IngestAccepted>>)> {
    let records = expect_batch(&body)?;

    let issues = validate_batch::<OrderRecord>(records);
    if !issues.is_empty() {
        return Err(ApiError::RecordValidation(issues));
    }

    accept_batch(
        &state,
        &body,
        records.len(),
        "orders",
        "订单数据已接收，进入处理队列",
    )
    .await
}

/// 请求体必须是非空 JSON 数组
fn expect_batch(body: &Value) -> Result<&Vec<Value>> {
    match body.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(ApiError::Validation(
            "请求体必须是非空 JSON 数组".to_string(),
        )),
    }
}

/// 逐条校验批量记录，收集全部问题而不是在第一条失败处停下
fn validate_batch<T>(items: &[Value]) -> Vec<RecordIssue>
where
    T: DeserializeOwned + Validate,
{
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(record) => {
                if let Err(errors) = record.validate() {
                    issues.push(RecordIssue::new(index, validation_message(&errors)));
                }
            }
            Err(e) => issues.push(RecordIssue::new(index, format!("记录结构无效: {e}"))),
        }
    }

    issues
}

/// 把字段级校验错误拍平成一条消息
///
/// 字段按名称排序，保证同一条坏记录在重试时得到相同的错误文本。
fn validation_message(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => parts.push(format!("{field}: {message}")),
                None => parts.push(format!("{field}: {}", error.code)),
            }
        }
    }

    parts.sort();
    parts.join("; ")
}

/// 批次入队并返回 202 受理回执
async fn accept_batch(
    state: &AppState,
    body: &Value,
    record_count: usize,
    kind: &'static str,
    message: &'static str,
) -> Result<(StatusCode, Json<ApiResponse<IngestAccepted>>)> {
    let batch_id = Uuid::now_v7().to_string();

    state
        .producer
        .send_json(topics::INGESTION_BATCHES, &batch_id, body)
        .await?;

    info!(batch_id = %batch_id, record_count, kind, "摄入批次已入队");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::accepted(
            IngestAccepted {
                batch_id,
                record_count,
            },
            message,
        )),
    ))
}
