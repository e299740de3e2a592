//! CRM 持久层
//!
//! 客户、订单、沟通日志三类实体的 Postgres 数据访问，
//! 摄入记录的线格式与路由，以及基于客户快照的受众解析。
//! 摄入侧全部走按自然键的幂等 upsert，重复投递天然安全。

pub mod audience;
pub mod campaign;
pub mod customer;
pub mod ingest;
pub mod order;

pub use audience::AudienceResolver;
pub use campaign::{
    CampaignStatus, CampaignTicket, CommunicationLog, CommunicationLogStore, DeliveryDetail,
    DeliveryJob, NewCommunicationLog,
};
pub use customer::{Customer, CustomerMetadata, CustomerStore};
pub use ingest::{CustomerRecord, OrderItemRecord, OrderRecord, RecordKind, classify_record};
pub use order::{Order, OrderStore};
