//! 死信队列处理
//!
//! 当消息处理失败且就地重试耗尽后，消息会被发送到死信队列（DLQ）。
//! DLQ 消费者会按退避策略尝试重新投递到原始 topic，超过上限后记录日志
//! 等待人工介入。这一机制确保批次和投递任务不会因瞬时故障而永久丢失。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::CrmError;
use crate::kafka::{ConsumerMessage, KafkaConsumer, KafkaProducer, topics};
use crate::retry::RetryPolicy;

/// 重投消息上携带已重试次数的 header 名
///
/// 信封在重投回原始 topic 时会被拆掉，重试次数通过该 header 跟随原始消息，
/// 业务消费者再次失败时把它传回 `send_to_dlq`，计数才能跨轮次累加。
pub const RETRY_COUNT_HEADER: &str = "x-dlq-retry-count";

/// 从消息 header 中读取已重试次数，首投消息没有该 header 时为 0
pub fn replay_attempts(headers: &HashMap<String, String>) -> u32 {
    headers
        .get(RETRY_COUNT_HEADER)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// DeadLetterMessage — 死信消息信封
// ---------------------------------------------------------------------------

/// 死信消息信封
///
/// 包装原始消息，附加失败原因、重试次数等元数据，
/// 便于在死信队列消费时决定是否重试或永久归档。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterMessage {
    /// 原始消息 ID（如批次 ID 或活动名）
    pub message_id: String,
    /// 原始 topic
    pub source_topic: String,
    /// 原始消息内容（JSON 序列化的字符串）
    pub payload: String,
    /// 失败原因
    pub error: String,
    /// 已重试次数
    pub retry_count: u32,
    /// 最大重试次数
    pub max_retries: u32,
    /// 首次失败时间
    pub first_failed_at: DateTime<Utc>,
    /// 最近失败时间
    pub last_failed_at: DateTime<Utc>,
    /// 下次重试时间（None 表示不再重试）
    pub next_retry_at: Option<DateTime<Utc>>,
    /// 来源服务
    pub source_service: String,
}

impl DeadLetterMessage {
    /// 创建新的死信消息
    ///
    /// 首次进入 DLQ 时 retry_count 为 0，next_retry_at 立即设置为当前时间，
    /// 让 DLQ 消费者在首轮扫描时即可尝试重新投递。
    pub fn new(
        message_id: impl Into<String>,
        source_topic: impl Into<String>,
        payload: impl Into<String>,
        error: impl Into<String>,
        max_retries: u32,
        source_service: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            message_id: message_id.into(),
            source_topic: source_topic.into(),
            payload: payload.into(),
            error: error.into(),
            retry_count: 0,
            max_retries,
            first_failed_at: now,
            last_failed_at: now,
            next_retry_at: Some(now),
            source_service: source_service.into(),
        }
    }

    /// 标记此前已消耗的重试次数
    ///
    /// 重投失败的消息再次进入 DLQ 时调用，使计数从上一轮继续累加，
    /// 并按退避策略推迟下一次重试；已达上限时不再安排重试。
    pub fn with_prior_retries(mut self, prior: u32, retry_policy: &RetryPolicy) -> Self {
        if prior == 0 {
            return self;
        }

        self.retry_count = prior;
        self.next_retry_at = if self.should_retry() {
            let delay = retry_policy.delay_for_attempt(prior);
            Some(self.last_failed_at + chrono::Duration::from_std(delay).unwrap_or_default())
        } else {
            None
        };
        self
    }

    /// 是否应继续重试
    ///
    /// 只要已重试次数尚未达到上限，就允许继续尝试
    pub fn should_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// 增加重试计数并更新元数据
    ///
    /// 每次重试失败后调用，更新错误信息和时间戳，
    /// 并根据退避策略计算下一次重试时间。
    /// 如果已达上限则 next_retry_at 置为 None，表示不再重试。
    pub fn increment_retry(&mut self, error: &str, retry_policy: &RetryPolicy) {
        self.retry_count += 1;
        self.error = error.to_string();
        self.last_failed_at = Utc::now();

        if self.should_retry() {
            let delay = retry_policy.delay_for_attempt(self.retry_count);
            self.next_retry_at =
                Some(self.last_failed_at + chrono::Duration::from_std(delay).unwrap_or_default());
        } else {
            // 已耗尽重试机会，不再安排重试
            self.next_retry_at = None;
        }
    }
}

// ---------------------------------------------------------------------------
// DlqProducer — 将失败消息发送到死信队列
// ---------------------------------------------------------------------------

/// DLQ 生产者
///
/// 消费者在消息处理失败后调用此组件将消息写入死信队列，
/// 而非直接丢弃。保证消息最终会被重试或人工处理。
pub struct DlqProducer {
    producer: KafkaProducer,
    source_service: String,
    retry_policy: RetryPolicy,
}

impl DlqProducer {
    pub fn new(producer: KafkaProducer, source_service: &str, retry_policy: RetryPolicy) -> Self {
        Self {
            producer,
            source_service: source_service.to_string(),
            retry_policy,
        }
    }

    /// 将失败消息发送到死信队列
    ///
    /// `prior_retries` 取自消息的重投 header（首投为 0），
    /// 保证同一条消息在多轮失败之间的重试计数连续。
    pub async fn send_to_dlq(
        &self,
        message_id: &str,
        source_topic: &str,
        payload: &str,
        error: &str,
        prior_retries: u32,
    ) -> Result<(), CrmError> {
        let dlq_msg = DeadLetterMessage::new(
            message_id,
            source_topic,
            payload,
            error,
            self.retry_policy.max_retries,
            &self.source_service,
        )
        .with_prior_retries(prior_retries, &self.retry_policy);

        self.producer
            .send_json(topics::DEAD_LETTER_QUEUE, message_id, &dlq_msg)
            .await?;

        warn!(
            message_id,
            source_topic,
            error,
            retry_count = dlq_msg.retry_count,
            "消息已发送到死信队列"
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DlqConsumer — 处理死信队列消息
// ---------------------------------------------------------------------------

/// DLQ 消费者
///
/// 持续消费死信队列，对尚有重试机会且已到达重试时间的消息重新投递到原始 topic。
/// 重试时间未到的消息被重新排到队尾，超过重试上限的消息记录日志以便人工介入。
pub struct DlqConsumer {
    consumer: KafkaConsumer,
    /// 将待重试的消息发回原始 topic，未到期的信封发回队尾
    producer: KafkaProducer,
}

impl DlqConsumer {
    /// 创建 DLQ 消费者
    ///
    /// 使用 `.dlq` 后缀作为独立消费组，与业务消费者互不干扰
    pub fn new(config: &AppConfig, producer: KafkaProducer) -> Result<Self, CrmError> {
        let consumer = KafkaConsumer::new(&config.kafka, Some("dlq"))?;
        consumer.subscribe(&[topics::DEAD_LETTER_QUEUE])?;

        info!(
            "DLQ 消费者已创建，订阅 topic: {}",
            topics::DEAD_LETTER_QUEUE
        );

        Ok(Self { consumer, producer })
    }

    /// 启动 DLQ 消费循环
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let producer = self.producer.clone();

        self.consumer
            .start(shutdown, move |msg| {
                let producer = producer.clone();
                async move { handle_dlq_message(&msg, &producer).await }
            })
            .await;

        info!("DLQ 消费循环已退出");
    }
}

/// 处理单条死信消息
///
/// 判断消息是否仍可重试且重试时间已到达：
/// - 可重试且已到期 → 将原始 payload 发回 source_topic，由业务消费者重新处理
/// - 可重试但未到期 → 将信封原样发回死信队列队尾，等待下一轮检查
/// - 不可重试 → 记录错误日志，需要人工介入处理
async fn handle_dlq_message(
    msg: &ConsumerMessage,
    producer: &KafkaProducer,
) -> Result<(), CrmError> {
    let dlq_msg: DeadLetterMessage = msg.deserialize_payload()?;

    if !dlq_msg.should_retry() {
        // 已耗尽重试次数，需人工介入
        error!(
            message_id = %dlq_msg.message_id,
            source_topic = %dlq_msg.source_topic,
            source_service = %dlq_msg.source_service,
            retry_count = dlq_msg.retry_count,
            max_retries = dlq_msg.max_retries,
            first_failed_at = %dlq_msg.first_failed_at,
            last_failed_at = %dlq_msg.last_failed_at,
            error = %dlq_msg.error,
            "死信消息已耗尽重试次数，需人工介入"
        );
        return Ok(());
    }

    let now = Utc::now();
    if let Some(next_retry) = dlq_msg.next_retry_at
        && now >= next_retry
    {
        info!(
            message_id = %dlq_msg.message_id,
            source_topic = %dlq_msg.source_topic,
            retry_count = dlq_msg.retry_count,
            max_retries = dlq_msg.max_retries,
            "重试死信消息，发回原始 topic"
        );

        // 信封到此拆掉，已用掉的重试次数通过 header 跟随原始消息
        let headers = HashMap::from([(
            RETRY_COUNT_HEADER.to_string(),
            (dlq_msg.retry_count + 1).to_string(),
        )]);

        producer
            .send_with_headers(
                &dlq_msg.source_topic,
                &dlq_msg.message_id,
                dlq_msg.payload.as_bytes(),
                &headers,
            )
            .await?;

        return Ok(());
    }

    // 重试时间未到：位点提交后消息不会再被投递，因此将信封发回队尾
    debug!(
        message_id = %dlq_msg.message_id,
        next_retry_at = ?dlq_msg.next_retry_at,
        "死信消息重试时间未到，重新排队"
    );

    producer
        .send_json(topics::DEAD_LETTER_QUEUE, &dlq_msg.message_id, &dlq_msg)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
