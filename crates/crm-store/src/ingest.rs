//! 摄入记录的线格式与校验
//!
//! 摄入接口收到的是记录数组，逐条做封闭结构校验（未知键拒绝）
//! 后整批入队；消费端按字段组合路由到客户或订单的 upsert。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::customer::CustomerMetadata;

/// 客户摄入记录
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CustomerRecord {
    #[serde(rename = "customerId")]
    #[validate(length(min = 1, message = "customerId 不能为空"))]
    pub customer_id: String,
    #[validate(length(min = 1, message = "name 不能为空"))]
    pub name: String,
    #[validate(email(message = "email 格式无效"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub metadata: Option<CustomerMetadata>,
}

/// 订单行项目
///
/// 行项目内部字段都允许缺省，结构仍是封闭的。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItemRecord {
    #[serde(rename = "itemId", default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// 订单摄入记录
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OrderRecord {
    #[serde(rename = "orderId")]
    #[validate(length(min = 1, message = "orderId 不能为空"))]
    pub order_id: String,
    #[serde(rename = "customerId")]
    #[validate(length(min = 1, message = "customerId 不能为空"))]
    pub customer_id: String,
    pub items: Vec<OrderItemRecord>,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    #[serde(rename = "orderDate", default)]
    pub order_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// 消费端路由
// ---------------------------------------------------------------------------

/// 批次内单条记录的类型判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Customer,
    Order,
    Unknown,
}

/// 按字段组合判定记录类型
///
/// 带 `customerId` 不带 `orderId` 的是客户，两者都带的是订单，
/// 其余无法路由。字段值为空串视同缺失。
pub fn classify_record(item: &Value) -> RecordKind {
    let has_customer = matches!(item.get("customerId"), Some(Value::String(s)) if !s.is_empty());
    let has_order = matches!(item.get("orderId"), Some(Value::String(s)) if !s.is_empty());

    match (has_customer, has_order) {
        (true, false) => RecordKind::Customer,
        (true, true) => RecordKind::Order,
        _ => RecordKind::Unknown,
    }
}
