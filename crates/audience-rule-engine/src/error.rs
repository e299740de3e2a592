//! 规则编译的错误类型
//!
//! 编译器对整棵树做全量校验，把所有问题收集完再一次性返回，
//! 调用方能把完整的问题清单原样透传给前端。

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RuleIssue — 单条校验问题
// ---------------------------------------------------------------------------

/// 单条校验问题：出错节点的路径加人类可读的说明
///
/// 路径从树根算起，如 `rules[1].rules[0].operator`；顶层组合器的路径为
/// `combinator`。该结构会被序列化进 400 响应，字段名是对外契约的一部分。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleIssue {
    pub path: String,
    pub message: String,
}

impl RuleIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleValidationError — 汇总后的编译失败
// ---------------------------------------------------------------------------

/// 编译失败：一棵树上收集到的全部校验问题
#[derive(Debug, Clone, PartialEq, Error)]
#[error("规则校验失败: {}", self.summary())]
pub struct RuleValidationError {
    pub issues: Vec<RuleIssue>,
}

impl RuleValidationError {
    pub fn new(issues: Vec<RuleIssue>) -> Self {
        Self { issues }
    }

    /// 把所有问题拼成一行，便于日志输出
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub type Result<T> = std::result::Result<T, RuleValidationError>;

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
