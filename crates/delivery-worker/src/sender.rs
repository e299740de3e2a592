//! 营销消息发送器
//!
//! 通过 `DeliverySender` trait 抽象发送行为。当前版本为模拟发送（仅记录日志），
//! 便于在无外部依赖的情况下验证投递管道的完整性；未来接入真实短信/邮件
//! 服务商时只需实现同一 trait。

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crm_shared::error::CrmError;
use crm_store::{CampaignStatus, CampaignTicket, DeliveryDetail};

/// 营销消息发送器 trait，具体渠道实现发送逻辑
#[async_trait]
pub trait DeliverySender: Send + Sync {
    /// 向单个客户发送活动消息，返回该客户的投递明细
    async fn send(
        &self,
        campaign: &CampaignTicket,
        customer_id: &str,
    ) -> Result<DeliveryDetail, CrmError>;
}

/// 模拟发送器
///
/// 生产环境中替换为短信/邮件服务商的 SDK 调用。
/// 消息 ID 由发送时刻的毫秒时间戳与客户 ID 拼接，明细时间戳取各自的发送时刻。
pub struct SimulatedSender;

#[async_trait]
impl DeliverySender for SimulatedSender {
    async fn send(
        &self,
        campaign: &CampaignTicket,
        customer_id: &str,
    ) -> Result<DeliveryDetail, CrmError> {
        let now = Utc::now();
        let message_id = format!("msg-{}-{}", now.timestamp_millis(), customer_id);

        info!(
            campaign = %campaign.name,
            customer_id,
            message_id = %message_id,
            "模拟发送营销消息"
        );

        Ok(DeliveryDetail {
            customer_id: customer_id.to_string(),
            status: CampaignStatus::Sent,
            message_id,
            timestamp: now,
        })
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
