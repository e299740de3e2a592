//! 共享库
//!
//! 包含所有服务共用的配置、错误处理、数据库连接、Kafka、死信队列等基础设施代码。

pub mod config;
pub mod database;
pub mod dlq;
pub mod error;
pub mod kafka;
pub mod observability;
pub mod retry;
