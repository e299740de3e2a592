//! 受众规则引擎
//!
//! 把活动创建接口收到的 JSON 规则树编译为可复用的内存谓词，
//! 受众圈选与人数预估共用同一条编译路径，保证两边口径一致。
//!
//! 分层：
//! - [`models`]：线格式规则树，只承载结构不做校验
//! - [`operators`]：字段、操作符、组合器的封闭枚举
//! - [`compiler`]：单次遍历完成全量校验并降为谓词树
//! - [`predicate`]：编译产物与求值，永不失败
//!
//! # 使用示例
//!
//! ```
//! use audience_rules::{RuleCompiler, RuleGroup};
//!
//! let group: RuleGroup = serde_json::from_value(serde_json::json!({
//!     "combinator": "and",
//!     "rules": [
//!         {"field": "total_spend", "operator": ">", "value": "10000"}
//!     ]
//! }))?;
//!
//! let predicate = RuleCompiler::new().compile(&group)?;
//! assert!(matches!(predicate, audience_rules::Predicate::And(_)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compiler;
pub mod error;
pub mod models;
pub mod operators;
pub mod predicate;

pub use compiler::{MAX_RULE_DEPTH, RuleCompiler};
pub use error::{Result, RuleIssue, RuleValidationError};
pub use models::{Rule, RuleGroup, RuleNode};
pub use operators::{AudienceField, Combinator, ComparisonOperator};
pub use predicate::{AudienceMember, Comparison, NumericField, Predicate};
