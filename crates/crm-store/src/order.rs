//! 订单实体与数据访问
//!
//! 订单由摄入链路按 `order_id` 幂等 upsert 写入，当前没有读取接口，
//! 落库即是终点。订单与客户之间不做外键约束：同一批次里订单可能
//! 先于客户到达。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::ingest::OrderRecord;
use crm_shared::error::Result;

/// 订单实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    /// 行项目数组，保持线格式原样存为 JSON
    pub items: Value,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    #[serde(rename = "orderDate")]
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 订单数据访问
#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 `order_id` 幂等 upsert 一条摄入记录
    ///
    /// `orderDate` 缺省时，新插入取当前时刻，更新保持原值。
    pub async fn upsert(&self, record: &OrderRecord) -> Result<()> {
        let items = serde_json::to_value(&record.items)?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (order_id, customer_id, items, total_amount, order_date)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            ON CONFLICT (order_id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                items = EXCLUDED.items,
                total_amount = EXCLUDED.total_amount,
                order_date = COALESCE($5, orders.order_date),
                updated_at = NOW()
            "#,
        )
        .bind(&record.order_id)
        .bind(&record.customer_id)
        .bind(items)
        .bind(record.total_amount)
        .bind(record.order_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 获取单个订单
    pub async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, customer_id, items, total_amount, order_date,
                   created_at, updated_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }
}
