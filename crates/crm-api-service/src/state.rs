//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use sqlx::PgPool;

use crm_shared::kafka::SharedProducer;
use crm_store::{AudienceResolver, CommunicationLogStore, CustomerStore};

use crate::auth::JwtManager;
use crate::dispatch::CampaignDispatcher;

/// Axum 应用共享状态
///
/// 各个存储句柄内部都持有同一个连接池的克隆，通过 Clone 在 handler 间共享。
#[derive(Clone)]
pub struct AppState {
    /// 客户数据访问
    pub customers: CustomerStore,
    /// 沟通日志数据访问
    pub logs: CommunicationLogStore,
    /// 活动派发服务
    pub dispatcher: CampaignDispatcher,
    /// Kafka 生产者句柄
    pub producer: SharedProducer,
    /// JWT 管理器
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(pool: PgPool, producer: SharedProducer, jwt: JwtManager) -> Self {
        let customers = CustomerStore::new(pool.clone());
        let logs = CommunicationLogStore::new(pool.clone());
        let resolver = AudienceResolver::new(CustomerStore::new(pool));
        let dispatcher = CampaignDispatcher::new(resolver, producer.clone());

        Self {
            customers,
            logs,
            dispatcher,
            producer,
            jwt: Arc::new(jwt),
        }
    }
}
