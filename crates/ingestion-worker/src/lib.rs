//! 摄入工作者服务
//!
//! 从 Kafka 消费 HTTP 层校验过的客户/订单批次，按记录类型路由到
//! 对应的幂等 upsert。瞬时故障先就地重试，耗尽后整批进死信队列，
//! 单条坏记录跳过并告警，不阻塞批内其余记录。

pub mod consumer;

pub use consumer::IngestionConsumer;
