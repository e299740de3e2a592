//! 规则树的线格式模型
//!
//! 这层类型只负责承载 JSON 结构，不做任何语义校验：
//! field/operator/combinator 保持原始字符串，value 保持原始 JSON 值，
//! 由 [`crate::RuleCompiler`] 在编译时统一校验并汇总所有问题。

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Rule — 叶子条件
// ---------------------------------------------------------------------------

/// 叶子条件：`字段 操作符 值`
///
/// `value` 声明为任意 JSON 值而非字符串，是为了让「条件值必须是字符串」
/// 成为编译期的校验问题而不是反序列化失败，错误信息能带上具体路径。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Rule {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: Value::String(value.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleNode — 树节点
// ---------------------------------------------------------------------------

/// 规则树节点：嵌套规则组或叶子条件
///
/// untagged 反序列化按声明顺序尝试，`Group` 必须排在最前：
/// 带 `combinator` 的对象优先按组解析，否则会被 `Other` 吞掉。
/// `Other` 兜底承接两者都不是的节点，让编译器能对它报出带路径的问题，
/// 而不是让整棵树在反序列化阶段整体失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(RuleGroup),
    Rule(Rule),
    Other(Value),
}

// ---------------------------------------------------------------------------
// RuleGroup — 规则组
// ---------------------------------------------------------------------------

/// 规则组：一个组合器加任意多个子节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub combinator: String,
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    pub fn new(combinator: impl Into<String>, rules: Vec<RuleNode>) -> Self {
        Self {
            combinator: combinator.into(),
            rules,
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
