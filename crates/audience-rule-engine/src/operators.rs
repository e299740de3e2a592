//! 规则 DSL 的算子与字段定义
//!
//! 线上传入的 field/operator/combinator 都是不可信的字符串，
//! 在编译入口处解析为封闭枚举；枚举之外的取值一律作为校验问题上报，
//! 原始字符串绝不进入谓词树。

use std::fmt;

// ---------------------------------------------------------------------------
// Combinator — 组合器
// ---------------------------------------------------------------------------

/// 组合器：规则组对子节点求值结果的合并方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    /// 从线格式解析，大小写敏感（线上契约规定小写）
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ComparisonOperator — 比较操作符
// ---------------------------------------------------------------------------

/// 叶子条件支持的比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
}

impl ComparisonOperator {
    /// 从线格式符号解析
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Neq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Contains => "contains",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ---------------------------------------------------------------------------
// AudienceField — 可筛选字段
// ---------------------------------------------------------------------------

/// DSL 暴露的可筛选字段
///
/// `email` 对应客户记录的顶层属性，其余字段都落在 `metadata` 命名空间下。
/// `inactive_days` 是唯一的派生字段：它不对应任何已存储的列，
/// 配合 `>` 使用时会被改写为对 `metadata.last_visit` 的时间比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudienceField {
    TotalSpend,
    VisitCount,
    InactiveDays,
    Email,
}

impl AudienceField {
    /// 从线格式解析
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "total_spend" => Some(Self::TotalSpend),
            "visit_count" => Some(Self::VisitCount),
            "inactive_days" => Some(Self::InactiveDays),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::TotalSpend => "total_spend",
            Self::VisitCount => "visit_count",
            Self::InactiveDays => "inactive_days",
            Self::Email => "email",
        }
    }

    /// 是否为数值字段（比较值需要先转成数字）
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::TotalSpend | Self::VisitCount | Self::InactiveDays)
    }
}

impl fmt::Display for AudienceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
