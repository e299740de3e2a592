//! 活动投递消费者
//!
//! 任务载荷为 `{campaignDetails, customerIds}`。对名单逐个执行模拟发送，
//! 再把全部明细连同活动元数据一次性写入沟通日志。位点只在写库成功后提交，
//! 重投因此可能产生重复的日志行（至少一次语义）。

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{error, info};

use crm_shared::config::AppConfig;
use crm_shared::dlq::{DlqProducer, replay_attempts};
use crm_shared::error::CrmError;
use crm_shared::kafka::{ConsumerMessage, KafkaConsumer, KafkaProducer, topics};
use crm_shared::retry::{RetryPolicy, retry_with_policy};
use crm_store::{CommunicationLogStore, DeliveryDetail, DeliveryJob, NewCommunicationLog};

use crate::sender::DeliverySender;

/// 投递消费者
pub struct DeliveryConsumer {
    consumer: KafkaConsumer,
    logs: CommunicationLogStore,
    sender: Arc<dyn DeliverySender>,
    dlq: DlqProducer,
    retry_policy: RetryPolicy,
}

impl DeliveryConsumer {
    pub fn new(
        config: &AppConfig,
        pool: PgPool,
        sender: Arc<dyn DeliverySender>,
        producer: KafkaProducer,
    ) -> Result<Self, CrmError> {
        let consumer = KafkaConsumer::new(&config.kafka, Some("delivery"))?;
        let retry_policy = RetryPolicy::default();
        let dlq = DlqProducer::new(producer, &config.service_name, retry_policy.clone());

        Ok(Self {
            consumer,
            logs: CommunicationLogStore::new(pool),
            sender,
            dlq,
            retry_policy,
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), CrmError> {
        self.consumer.subscribe(&[topics::CAMPAIGN_DELIVERIES])?;

        info!(topic = topics::CAMPAIGN_DELIVERIES, "投递消费者已启动");

        let logs = self.logs;
        let sender = self.sender;
        let dlq = self.dlq;
        let retry_policy = self.retry_policy;

        self.consumer
            .start(shutdown, |msg| {
                let logs = &logs;
                let sender = &sender;
                let dlq = &dlq;
                let retry_policy = &retry_policy;
                async move { handle_job(logs, sender.as_ref(), dlq, retry_policy, &msg).await }
            })
            .await;

        info!("投递消费者已停止");
        Ok(())
    }
}

/// 处理单条投递任务消息
///
/// 确定性失败（载荷损坏、重试耗尽）转投死信队列后返回 `Ok`，
/// 让位点推进，避免毒消息阻塞整个分区。
async fn handle_job(
    logs: &CommunicationLogStore,
    sender: &dyn DeliverySender,
    dlq: &DlqProducer,
    retry_policy: &RetryPolicy,
    msg: &ConsumerMessage,
) -> Result<(), CrmError> {
    let prior_retries = replay_attempts(&msg.headers);

    let job: DeliveryJob = match msg.deserialize_payload() {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "投递任务载荷解析失败，转投死信队列");
            let message_id = msg
                .key
                .clone()
                .unwrap_or_else(|| format!("{}-{}", msg.partition, msg.offset));
            let payload = String::from_utf8_lossy(&msg.payload).into_owned();
            dlq.send_to_dlq(&message_id, &msg.topic, &payload, &e.to_string(), prior_retries)
                .await?;
            return Ok(());
        }
    };

    info!(
        campaign = %job.campaign_details.name,
        audience_size = job.customer_ids.len(),
        "开始处理投递任务"
    );

    match process_job(logs, sender, retry_policy, &job).await {
        Ok(log_id) => {
            info!(
                campaign = %job.campaign_details.name,
                log_id,
                sent_count = job.customer_ids.len(),
                "投递任务处理完成，沟通日志已写入"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                campaign = %job.campaign_details.name,
                error = %e,
                "投递任务处理失败，转投死信队列"
            );
            let payload = String::from_utf8_lossy(&msg.payload).into_owned();
            dlq.send_to_dlq(
                &job.campaign_details.name,
                &msg.topic,
                &payload,
                &e.to_string(),
                prior_retries,
            )
            .await?;
            Ok(())
        }
    }
}

/// 逐个发送并一次性落日志，返回日志主键
///
/// 发送或写库任一失败都不会留下部分日志，整个任务走重试/死信路径。
pub async fn process_job(
    logs: &CommunicationLogStore,
    sender: &dyn DeliverySender,
    retry_policy: &RetryPolicy,
    job: &DeliveryJob,
) -> Result<i64, CrmError> {
    let details = send_all(sender, job).await?;
    let log = NewCommunicationLog::from_delivery(job, details, Utc::now())?;

    let log_id = retry_with_policy(
        retry_policy,
        "insert_communication_log",
        CrmError::is_retryable,
        || logs.insert(&log),
    )
    .await?;

    Ok(log_id)
}

/// 按名单顺序逐个发送，名单里的每个 ID 都产生一条明细
async fn send_all(
    sender: &dyn DeliverySender,
    job: &DeliveryJob,
) -> Result<Vec<DeliveryDetail>, CrmError> {
    let mut details = Vec::with_capacity(job.customer_ids.len());
    for customer_id in &job.customer_ids {
        details.push(sender.send(&job.campaign_details, customer_id).await?);
    }
    Ok(details)
}
