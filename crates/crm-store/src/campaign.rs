//! 活动工单、投递任务与沟通日志
//!
//! 活动创建只发队列不落库；沟通日志由投递消费端在模拟发送完成后
//! 一次性写入，是活动在库里的唯一记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgPool, Row};

use audience_rules::RuleGroup;
use crm_shared::error::Result;

/// 活动/投递状态
///
/// 活动工单与单条投递明细共用同一组状态值。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Queued,
    Sent,
    Failed,
}

// ---------------------------------------------------------------------------
// 活动工单与投递任务
// ---------------------------------------------------------------------------

/// 活动工单
///
/// 活动创建接口的返回体，也作为 `campaignDetails` 原样进入投递任务；
/// 创建时刻固定为 `queued`、零计数，真实计数由消费端写进日志。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignTicket {
    pub name: String,
    pub audience_size: i64,
    pub rules: RuleGroup,
    pub status: CampaignStatus,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
}

impl CampaignTicket {
    /// 构造排队中的新活动工单
    pub fn queued(
        name: impl Into<String>,
        audience_size: i64,
        rules: RuleGroup,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            audience_size,
            rules,
            status: CampaignStatus::Queued,
            sent_count: 0,
            failed_count: 0,
            created_at: now,
        }
    }
}

/// 投递任务
///
/// 活动创建后发往投递主题的消息体，字段名是队列契约的一部分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryJob {
    #[serde(rename = "campaignDetails")]
    pub campaign_details: CampaignTicket,
    #[serde(rename = "customerIds")]
    pub customer_ids: Vec<String>,
}

/// 单条投递明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetail {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub status: CampaignStatus,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// 沟通日志
// ---------------------------------------------------------------------------

/// 待写入的沟通日志
#[derive(Debug, Clone, Serialize)]
pub struct NewCommunicationLog {
    pub name: String,
    pub audience_size: i64,
    pub rules: Value,
    pub status: CampaignStatus,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    pub delivery_details: Value,
}

impl NewCommunicationLog {
    /// 由完成模拟发送的投递任务构造日志
    ///
    /// `sent_count` 等于明细条数，`failed_count` 恒为 0，状态恒为 `sent`；
    /// 零受众任务同样落一条日志，明细为空数组。
    pub fn from_delivery(
        job: &DeliveryJob,
        details: Vec<DeliveryDetail>,
        now: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            name: job.campaign_details.name.clone(),
            audience_size: job.campaign_details.audience_size,
            rules: serde_json::to_value(&job.campaign_details.rules)?,
            status: CampaignStatus::Sent,
            sent_count: details.len() as i64,
            failed_count: 0,
            created_at: now,
            delivery_details: serde_json::to_value(&details)?,
        })
    }
}

/// 沟通日志实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommunicationLog {
    pub id: i64,
    pub name: String,
    pub audience_size: i64,
    pub rules: Value,
    pub status: CampaignStatus,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    pub delivery_details: Value,
}

impl CommunicationLog {
    /// 解析投递明细
    pub fn parse_delivery_details(&self) -> serde_json::Result<Vec<DeliveryDetail>> {
        serde_json::from_value(self.delivery_details.clone())
    }
}

/// 沟通日志数据访问
#[derive(Clone)]
pub struct CommunicationLogStore {
    pool: PgPool,
}

impl CommunicationLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 插入一条沟通日志，返回自增主键
    pub async fn insert(&self, log: &NewCommunicationLog) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO communication_logs
                (name, audience_size, rules, status, sent_count, failed_count,
                 created_at, delivery_details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&log.name)
        .bind(log.audience_size)
        .bind(&log.rules)
        .bind(log.status)
        .bind(log.sent_count)
        .bind(log.failed_count)
        .bind(log.created_at)
        .bind(&log.delivery_details)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// 获取单条沟通日志
    pub async fn get(&self, id: i64) -> Result<Option<CommunicationLog>> {
        let log = sqlx::query_as::<_, CommunicationLog>(
            r#"
            SELECT id, name, audience_size, rules, status, sent_count, failed_count,
                   created_at, delivery_details
            FROM communication_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    /// 活动历史，按创建时间倒序
    pub async fn list_recent(&self) -> Result<Vec<CommunicationLog>> {
        let logs = sqlx::query_as::<_, CommunicationLog>(
            r#"
            SELECT id, name, audience_size, rules, status, sent_count, failed_count,
                   created_at, delivery_details
            FROM communication_logs
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
