//! 测试数据 Fixtures
//!
//! 预定义的测试数据，用于快速创建测试场景。
//! 客户种子携带已知的画像指标，邮箱域里埋了组合标签，
//! 规则加上标签条件后人数断言不受环境中其他数据干扰。

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::generators::RuleJsonGenerator;

/// 生成唯一后缀以避免并行测试冲突
pub(crate) fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// 生成唯一活动名（`Test` 前缀供清理逻辑识别）
pub fn campaign_name(label: &str) -> String {
    format!("Test{}_{}", label, unique_suffix())
}

// ========== 客户种子 ==========

/// 已知画像的客户种子
///
/// 同时保存 ID 与指标，便于在断言中引用。
#[derive(Debug, Clone)]
pub struct CustomerSeed {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub total_spend: Option<f64>,
    pub visit_count: Option<i64>,
    pub last_visit_days_ago: Option<i64>,
}

impl CustomerSeed {
    /// 转成摄入接口的线格式记录
    pub fn record(&self) -> Value {
        let mut record = json!({
            "customerId": self.customer_id,
            "name": self.name,
            "email": self.email,
        });

        if let Some(phone) = &self.phone {
            record["phone"] = json!(phone);
        }

        let mut metadata = serde_json::Map::new();
        if let Some(total_spend) = self.total_spend {
            metadata.insert("total_spend".to_string(), json!(total_spend));
        }
        if let Some(visit_count) = self.visit_count {
            metadata.insert("visit_count".to_string(), json!(visit_count));
        }
        if let Some(days_ago) = self.last_visit_days_ago {
            let last_visit = Utc::now() - Duration::days(days_ago);
            metadata.insert("last_visit".to_string(), json!(last_visit.to_rfc3339()));
        }
        if !metadata.is_empty() {
            record["metadata"] = Value::Object(metadata);
        }

        record
    }
}

/// 测试客户
///
/// 带标签的构造器把 `tag` 埋进邮箱域，供按标签圈定受众；
/// 指标取值与 `TestRules` 的阈值配套。
pub struct TestCustomers;

impl TestCustomers {
    /// 高消费活跃客户：spend 25000 / visit 12 / 5 天前来访
    pub fn vip_active(tag: &str) -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_vip_{}", suffix),
            name: format!("Test高消费_{}", suffix),
            email: format!("vip-{}@acme-{}.com", suffix, tag),
            phone: Some("13800138000".to_string()),
            total_spend: Some(25000.0),
            visit_count: Some(12),
            last_visit_days_ago: Some(5),
        }
    }

    /// 高消费低频客户：spend 12000 / visit 2 / 10 天前来访
    ///
    /// 邮箱域故意用大写 `QQ`，配合 contains 的大小写不敏感用例。
    pub fn vip_rare(tag: &str) -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_viprare_{}", suffix),
            name: format!("Test高消费低频_{}", suffix),
            email: format!("rare-{}@QQ-{}.com", suffix, tag),
            phone: None,
            total_spend: Some(12000.0),
            visit_count: Some(2),
            last_visit_days_ago: Some(10),
        }
    }

    /// 沉睡客户：spend 3000 / visit 1 / 120 天前来访
    pub fn dormant(tag: &str) -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_dormant_{}", suffix),
            name: format!("Test沉睡_{}", suffix),
            email: format!("dormant-{}@qq-{}.com", suffix, tag),
            phone: None,
            total_spend: Some(3000.0),
            visit_count: Some(1),
            last_visit_days_ago: Some(120),
        }
    }

    /// 低消费活跃客户：spend 800 / visit 6 / 2 天前来访
    pub fn casual(tag: &str) -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_casual_{}", suffix),
            name: format!("Test低消费_{}", suffix),
            email: format!("casual-{}@gmail-{}.com", suffix, tag),
            phone: Some("13900139000".to_string()),
            total_spend: Some(800.0),
            visit_count: Some(6),
            last_visit_days_ago: Some(2),
        }
    }

    /// 无画像客户：三个指标全缺失
    pub fn bare(tag: &str) -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_bare_{}", suffix),
            name: format!("Test无画像_{}", suffix),
            email: format!("bare-{}@mail-{}.com", suffix, tag),
            phone: None,
            total_spend: None,
            visit_count: None,
            last_visit_days_ago: None,
        }
    }

    /// 不挂场景标签的普通客户
    pub fn basic() -> CustomerSeed {
        let suffix = unique_suffix();
        CustomerSeed {
            customer_id: format!("test_cust_{}", suffix),
            name: format!("Test客户_{}", suffix),
            email: format!("cust-{}@example.com", suffix),
            phone: None,
            total_spend: Some(1500.0),
            visit_count: Some(3),
            last_visit_days_ago: Some(7),
        }
    }

    // ---- 非法记录，校验用例用 ----

    /// 缺少 customerId
    pub fn missing_id() -> Value {
        json!({
            "name": "Test缺ID",
            "email": format!("noid-{}@example.com", unique_suffix())
        })
    }

    /// 邮箱格式错误
    pub fn bad_email() -> Value {
        json!({
            "customerId": format!("test_bademail_{}", unique_suffix()),
            "name": "Test坏邮箱",
            "email": "不是邮箱"
        })
    }

    /// 携带模式之外的未知字段
    pub fn unknown_field() -> Value {
        json!({
            "customerId": format!("test_unknown_{}", unique_suffix()),
            "name": "Test未知字段",
            "email": format!("unknown-{}@example.com", unique_suffix()),
            "nickname": "模式外字段"
        })
    }
}

// ========== 订单 fixtures ==========

/// 测试订单
pub struct TestOrders;

impl TestOrders {
    /// 单条合法订单
    pub fn order_for(customer_id: &str, amount: f64) -> Value {
        json!({
            "orderId": format!("test_order_{}", unique_suffix()),
            "customerId": customer_id,
            "items": [
                {"itemId": "sku-001", "price": amount, "quantity": 1}
            ],
            "totalAmount": amount,
            "orderDate": Utc::now().to_rfc3339()
        })
    }

    /// 缺少 totalAmount 的非法订单
    pub fn missing_amount(customer_id: &str) -> Value {
        json!({
            "orderId": format!("test_order_{}", unique_suffix()),
            "customerId": customer_id,
            "items": []
        })
    }
}

// ========== 规则 fixtures ==========

/// 测试规则树
///
/// 结构类 fixtures，不挂场景标签；需要精确人数时
/// 用 `AudienceMix` 上的带标签规则。
pub struct TestRules;

impl TestRules {
    /// 空规则组：匹配全部客户
    pub fn match_all() -> Value {
        json!({"combinator": "and", "rules": []})
    }

    /// 未知字段的非法规则
    pub fn bogus_field() -> Value {
        RuleJsonGenerator::and_group(vec![RuleJsonGenerator::condition(
            "loyalty_tier",
            ">",
            "3",
        )])
    }

    /// 多处问题的非法规则：坏字段 + 坏操作符 + 非字符串值
    pub fn multiple_problems() -> Value {
        json!({
            "combinator": "and",
            "rules": [
                {"field": "loyalty_tier", "operator": ">", "value": "3"},
                {"field": "total_spend", "operator": "~", "value": "100"},
                {"field": "visit_count", "operator": ">", "value": 5}
            ]
        })
    }

    /// 大写组合器的非法规则
    pub fn uppercase_combinator() -> Value {
        json!({
            "combinator": "AND",
            "rules": [
                {"field": "total_spend", "operator": ">", "value": "100"}
            ]
        })
    }

    /// 嵌套空组的非法规则：顶层空组合法，嵌套空组不合法
    pub fn nested_empty_group() -> Value {
        json!({
            "combinator": "and",
            "rules": [
                {"combinator": "or", "rules": []}
            ]
        })
    }
}
