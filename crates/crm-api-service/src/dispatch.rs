//! 活动派发服务
//!
//! 受众预估与活动创建共用同一条"编译规则、解析受众"的路径，
//! 保证预估人数与实际圈选结果口径一致。活动创建不写库：
//! 工单连同受众名单发往投递主题，沟通日志由投递侧在发送完成后落库。

use chrono::Utc;
use tracing::info;

use audience_rules::{RuleCompiler, RuleGroup};
use crm_shared::kafka::{SharedProducer, topics};
use crm_store::{AudienceResolver, CampaignTicket, DeliveryJob};

use crate::error::Result;

/// 活动派发服务
#[derive(Clone)]
pub struct CampaignDispatcher {
    compiler: RuleCompiler,
    resolver: AudienceResolver,
    producer: SharedProducer,
}

impl CampaignDispatcher {
    pub fn new(resolver: AudienceResolver, producer: SharedProducer) -> Self {
        Self {
            compiler: RuleCompiler::new(),
            resolver,
            producer,
        }
    }

    /// 预估规则命中的受众人数
    pub async fn preview(&self, rules: &RuleGroup) -> Result<u64> {
        let predicate = self.compiler.compile(rules)?;
        let count = self.resolver.count(&predicate).await?;

        Ok(count)
    }

    /// 创建活动：圈选受众、生成工单、投递任务入队
    ///
    /// 返回的工单即接口响应体，同一份数据作为 `campaignDetails`
    /// 原样进入投递任务。入队失败时整个创建失败，不会留下半成品。
    pub async fn create_campaign(&self, name: &str, rules: RuleGroup) -> Result<CampaignTicket> {
        let predicate = self.compiler.compile(&rules)?;
        let customer_ids = self.resolver.select(&predicate).await?;

        let ticket = CampaignTicket::queued(name, customer_ids.len() as i64, rules, Utc::now());
        let job = DeliveryJob {
            campaign_details: ticket.clone(),
            customer_ids,
        };

        self.producer
            .send_json(topics::CAMPAIGN_DELIVERIES, name, &job)
            .await?;

        info!(
            campaign = %ticket.name,
            audience_size = ticket.audience_size,
            "活动已创建，投递任务入队"
        );

        Ok(ticket)
    }
}
