//! 活动投递工作者
//!
//! 消费活动投递任务，对受众名单逐个执行模拟发送，
//! 并将整个活动的投递结果一次性写入沟通日志。

pub mod consumer;
pub mod sender;

pub use consumer::DeliveryConsumer;
pub use sender::{DeliverySender, SimulatedSender};
