//! 客户实体与数据访问
//!
//! 客户由摄入链路按 `customer_id` 幂等 upsert 写入，只增不删；
//! 受众圈选通过 [`AudienceMember`] 视图在内存中对客户求值。

use audience_rules::{AudienceMember, NumericField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::ingest::CustomerRecord;
use crm_shared::error::Result;

/// 客户画像指标
///
/// 线格式中挂在 `metadata` 下，库表中平铺为三列。
/// 三个指标都可能缺失：缺失的指标在规则求值时一律按不匹配处理。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(deny_unknown_fields)]
pub struct CustomerMetadata {
    #[serde(default)]
    #[sqlx(default)]
    pub total_spend: Option<f64>,
    #[serde(default)]
    #[sqlx(default)]
    pub visit_count: Option<i64>,
    #[serde(default)]
    #[sqlx(default)]
    pub last_visit: Option<DateTime<Utc>>,
}

/// 客户实体
///
/// 序列化形态即对外契约：`customerId` 驼峰，指标嵌套在 `metadata` 下。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    #[sqlx(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[sqlx(flatten)]
    pub metadata: CustomerMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AudienceMember for Customer {
    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn numeric_field(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::TotalSpend => self.metadata.total_spend,
            NumericField::VisitCount => self.metadata.visit_count.map(|count| count as f64),
            // 派生字段，从不落库，读取恒为 None
            NumericField::InactiveDays => None,
        }
    }

    fn last_visit(&self) -> Option<DateTime<Utc>> {
        self.metadata.last_visit
    }
}

/// 客户数据访问
#[derive(Clone)]
pub struct CustomerStore {
    pool: PgPool,
}

impl CustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 `customer_id` 幂等 upsert 一条摄入记录
    ///
    /// `metadata` 为子对象整体替换：请求携带时覆盖全部三列，
    /// 缺省时保持原值；`phone` 缺省同样保持原值。
    pub async fn upsert(&self, record: &CustomerRecord) -> Result<()> {
        let metadata = record.metadata.as_ref();

        sqlx::query(
            r#"
            INSERT INTO customers
                (customer_id, name, email, phone, total_spend, visit_count, last_visit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (customer_id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = COALESCE(EXCLUDED.phone, customers.phone),
                total_spend = CASE WHEN $8 THEN EXCLUDED.total_spend ELSE customers.total_spend END,
                visit_count = CASE WHEN $8 THEN EXCLUDED.visit_count ELSE customers.visit_count END,
                last_visit = CASE WHEN $8 THEN EXCLUDED.last_visit ELSE customers.last_visit END,
                updated_at = NOW()
            "#,
        )
        .bind(&record.customer_id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(metadata.and_then(|m| m.total_spend))
        .bind(metadata.and_then(|m| m.visit_count))
        .bind(metadata.and_then(|m| m.last_visit))
        .bind(metadata.is_some())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 获取单个客户
    pub async fn get(&self, customer_id: &str) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, email, phone, total_spend, visit_count, last_visit,
                   created_at, updated_at
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// 列出全部客户
    ///
    /// 受众解析对全量客户做内存求值，每次调用都取当前快照、不做缓存。
    pub async fn list_all(&self) -> Result<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, email, phone, total_spend, visit_count, last_visit,
                   created_at, updated_at
            FROM customers
            ORDER BY created_at ASC, customer_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}
