//! 受众解析
//!
//! 人数预估与圈选共用同一套求值逻辑：取客户全量快照，
//! 在内存里逐个对谓词求值。两个操作各自取各自的快照，
//! 同一快照上 `count` 与 `select` 的结果必然一致。

use audience_rules::Predicate;
use tracing::debug;

use crate::customer::{Customer, CustomerStore};
use crm_shared::error::Result;

/// 在一份客户快照上筛出命中谓词的客户 ID
///
/// 输出顺序与快照顺序一致；`customer_id` 唯一，结果不会有重复。
pub fn matching_ids(customers: &[Customer], predicate: &Predicate) -> Vec<String> {
    customers
        .iter()
        .filter(|customer| predicate.matches(*customer))
        .map(|customer| customer.customer_id.clone())
        .collect()
}

/// 受众解析器
#[derive(Clone)]
pub struct AudienceResolver {
    customers: CustomerStore,
}

impl AudienceResolver {
    pub fn new(customers: CustomerStore) -> Self {
        Self { customers }
    }

    /// 预估命中人数
    pub async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let snapshot = self.customers.list_all().await?;
        let matched = matching_ids(&snapshot, predicate).len() as u64;
        debug!(total = snapshot.len(), matched, "受众人数预估完成");
        Ok(matched)
    }

    /// 圈选命中客户的 ID 列表
    pub async fn select(&self, predicate: &Predicate) -> Result<Vec<String>> {
        let snapshot = self.customers.list_all().await?;
        let matched = matching_ids(&snapshot, predicate);
        debug!(total = snapshot.len(), matched = matched.len(), "受众圈选完成");
        Ok(matched)
    }
}
