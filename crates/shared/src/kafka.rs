//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer/Consumer 抽象，
//! 统一消息序列化、错误映射、位点提交和优雅关闭语义，避免各服务重复编写样板代码。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::CrmError;

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// 集中管理所有 Kafka topic 名称，防止字符串散落在各服务中导致拼写不一致
pub mod topics {
    /// 摄入批次：HTTP 层校验通过的客户/订单原始数组
    pub const INGESTION_BATCHES: &str = "crm.ingestion.batches";
    /// 投递任务：营销活动的受众名单与活动元数据
    pub const CAMPAIGN_DELIVERIES: &str = "crm.campaign.deliveries";
    /// 死信队列：处理失败的消息带重试信息转投到这里
    pub const DEAD_LETTER_QUEUE: &str = "crm.dlq";
}

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
    pub headers: HashMap<String, String>,
}

impl ConsumerMessage {
    /// 从 rdkafka 的借用消息构造，提取并拥有所有字段
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();

        let timestamp = msg.timestamp().to_millis();

        let mut headers = HashMap::new();
        if let Some(h) = msg.headers() {
            for idx in 0..h.count() {
                let header = h.get(idx);
                if let Some(raw) = header.value
                    && let Ok(value) = std::str::from_utf8(raw)
                {
                    headers.insert(header.key.to_string(), value.to_string());
                }
            }
        }

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload,
            timestamp,
            headers,
        }
    }

    /// 将负载视为 UTF-8 字符串返回
    pub fn payload_str(&self) -> Result<&str, CrmError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| CrmError::Kafka(format!("负载非 UTF-8 编码: {e}")))
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, CrmError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| CrmError::Kafka(format!("负载反序列化失败: {e}")))
    }
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// 封装 `FutureProducer` 并提供类型安全的 JSON 发送方法，
/// 内部已派生 Clone（`FutureProducer` 本身是 Arc 包装的）。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    ///
    /// 设置 `message.timeout.ms` 为 5 秒——如果 5 秒内仍无法投递，
    /// 应由上层返回依赖错误或写入死信队列，而非无限等待。
    pub fn new(config: &KafkaConfig) -> Result<Self, CrmError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| CrmError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, "Kafka 生产者已初始化");
        Ok(Self { producer })
    }

    /// 发送原始字节消息
    pub async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(i32, i64), CrmError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        // rdkafka 0.39+ 返回 Delivery 结构体而非元组
        let delivery = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| CrmError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }

    /// 发送带 header 的字节消息
    ///
    /// header 用于携带与消息体解耦的元数据，例如死信重投时的已重试次数。
    pub async fn send_with_headers(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<(i32, i64), CrmError> {
        let mut owned = OwnedHeaders::new_with_capacity(headers.len());
        for (header_key, value) in headers {
            owned = owned.insert(Header {
                key: header_key.as_str(),
                value: Some(value.as_bytes()),
            });
        }

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(owned);

        let delivery = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| CrmError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            header_count = headers.len(),
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }

    /// 将值序列化为 JSON 后发送
    ///
    /// 序列化与网络发送拆分为两步，便于独立定位故障原因。
    pub async fn send_json<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        value: &T,
    ) -> Result<(i32, i64), CrmError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| CrmError::Kafka(format!("序列化失败: {e}")))?;

        self.send(topic, key, &payload).await
    }
}

// ---------------------------------------------------------------------------
// SharedProducer
// ---------------------------------------------------------------------------

/// 进程级共享的惰性生产者句柄
///
/// HTTP 层的多个并发请求共享同一个底层生产者：首个调用触发初始化，
/// 初始化进行中的其他调用等待同一次结果而不是各自发起连接。
/// 初始化失败不会被缓存，下一个调用会重新尝试。
#[derive(Clone)]
pub struct SharedProducer {
    config: KafkaConfig,
    inner: Arc<OnceCell<KafkaProducer>>,
}

impl SharedProducer {
    /// 创建未连接状态的句柄，不触发任何网络操作
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            inner: Arc::new(OnceCell::new()),
        }
    }

    /// 获取底层生产者，首次调用时完成初始化
    pub async fn producer(&self) -> Result<&KafkaProducer, CrmError> {
        self.inner
            .get_or_try_init(|| async { KafkaProducer::new(&self.config) })
            .await
    }

    /// 句柄是否已完成初始化
    pub fn is_connected(&self) -> bool {
        self.inner.initialized()
    }

    /// 便捷方法：获取生产者并发送 JSON 消息
    pub async fn send_json<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        value: &T,
    ) -> Result<(i32, i64), CrmError> {
        self.producer().await?.send_json(topic, key, value).await
    }
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 消费者
///
/// 封装 `StreamConsumer` 并提供基于 `watch` channel 的优雅关闭语义。
/// 自动提交被禁用：位点只在消息处理成功后提交，保证"先落库、后确认"。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    /// 创建消费者
    ///
    /// `group_id_suffix` 允许同一服务内不同消费逻辑使用独立的消费组，
    /// 例如 "crm-workers.ingestion" 和 "crm-workers.delivery"。
    pub fn new(config: &KafkaConfig, group_id_suffix: Option<&str>) -> Result<Self, CrmError> {
        let group_id = match group_id_suffix {
            Some(suffix) => format!("{}.{}", config.consumer_group, suffix),
            None => config.consumer_group.clone(),
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| CrmError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(brokers = %config.brokers, group_id, "Kafka 消费者已初始化");
        Ok(Self { consumer })
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), CrmError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| CrmError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动消费循环
    ///
    /// 使用 `tokio::select!` 同时监听消息流和关闭信号：
    /// - handler 返回 `Ok` 时才提交该消息的位点；返回 `Err` 时位点不提交，
    ///   消息会在消费组重平衡或进程重启后重投。
    /// - handler 应把确定性失败的毒消息转投死信队列后返回 `Ok`，
    ///   避免单条坏消息阻塞后续位点推进。
    /// - 关闭信号变为 `true` 时退出循环，确保正在执行的 handler 能自然完成。
    pub async fn start<F, Fut>(self, mut shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: std::future::Future<Output = Result<(), CrmError>>,
    {
        info!("Kafka 消费循环已启动");

        loop {
            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("收到关闭信号，Kafka 消费循环退出");
                        break;
                    }
                }

                msg_result = self.consumer.recv() => {
                    match msg_result {
                        Ok(borrowed_msg) => {
                            let msg = ConsumerMessage::from_borrowed(&borrowed_msg);
                            debug!(
                                topic = %msg.topic,
                                partition = msg.partition,
                                offset = msg.offset,
                                "收到 Kafka 消息"
                            );

                            match handler(msg).await {
                                Ok(()) => {
                                    if let Err(e) =
                                        self.consumer.commit_message(&borrowed_msg, CommitMode::Async)
                                    {
                                        error!(error = %e, "提交消费位点失败");
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, "处理 Kafka 消息失败，位点未提交，等待重投");
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "接收 Kafka 消息出错");
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
