//! 编译后的谓词树与求值
//!
//! 谓词树是编译产物，内部只有封闭枚举与解析好的数值/时间，
//! 求值阶段不再接触原始字符串，也不可能失败：字段缺失按不匹配处理。

use chrono::{DateTime, Utc};

use crate::operators::ComparisonOperator;

/// 浮点相等比较的容差
const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// AudienceMember — 受众成员视图
// ---------------------------------------------------------------------------

/// 数值字段标识，求值时由成员自己决定取哪个属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    TotalSpend,
    VisitCount,
    /// 不对应任何已存储属性，读取恒为 None
    InactiveDays,
}

/// 谓词求值需要的成员视图
///
/// 引擎不关心成员的存储形态，只要求按字段读值；缺失一律返回 None，
/// 由求值逻辑统一按「不匹配」处理。
pub trait AudienceMember {
    fn email(&self) -> Option<&str>;
    fn numeric_field(&self, field: NumericField) -> Option<f64>;
    fn last_visit(&self) -> Option<DateTime<Utc>>;
}

// ---------------------------------------------------------------------------
// Comparison — 叶子比较
// ---------------------------------------------------------------------------

/// 编译后的叶子比较
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// email 字段的文本比较
    EmailText {
        op: ComparisonOperator,
        value: String,
    },
    /// metadata 数值字段的数值比较
    MetadataNumber {
        field: NumericField,
        op: ComparisonOperator,
        value: f64,
    },
    /// `inactive_days > N` 的改写形态：最近访问时间早于截止点
    LastVisitBefore { cutoff: DateTime<Utc> },
}

impl Comparison {
    fn matches(&self, member: &impl AudienceMember) -> bool {
        match self {
            Self::EmailText { op, value } => match member.email() {
                Some(email) => compare_text(email, *op, value),
                None => false,
            },
            Self::MetadataNumber { field, op, value } => match member.numeric_field(*field) {
                Some(actual) => compare_number(actual, *op, *value),
                None => false,
            },
            Self::LastVisitBefore { cutoff } => match member.last_visit() {
                Some(last_visit) => last_visit < *cutoff,
                None => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate — 谓词树
// ---------------------------------------------------------------------------

/// 编译后的谓词树
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// 恒真：空规则组编译产物，匹配全部成员
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare(Comparison),
}

impl Predicate {
    /// 对单个成员求值
    pub fn matches(&self, member: &impl AudienceMember) -> bool {
        match self {
            Self::True => true,
            Self::And(children) => children.iter().all(|child| child.matches(member)),
            Self::Or(children) => children.iter().any(|child| child.matches(member)),
            Self::Compare(comparison) => comparison.matches(member),
        }
    }
}

// ---------------------------------------------------------------------------
// 比较语义
// ---------------------------------------------------------------------------

fn compare_number(actual: f64, op: ComparisonOperator, expected: f64) -> bool {
    match op {
        ComparisonOperator::Eq => (actual - expected).abs() < EPSILON,
        ComparisonOperator::Neq => (actual - expected).abs() >= EPSILON,
        ComparisonOperator::Lt => actual < expected,
        ComparisonOperator::Lte => actual <= expected,
        ComparisonOperator::Gt => actual > expected,
        ComparisonOperator::Gte => actual >= expected,
        // 数值字段不支持 contains，编译器已拦截，这里兜底为不匹配
        ComparisonOperator::Contains => false,
    }
}

fn compare_text(actual: &str, op: ComparisonOperator, expected: &str) -> bool {
    match op {
        ComparisonOperator::Eq => actual == expected,
        ComparisonOperator::Neq => actual != expected,
        ComparisonOperator::Lt => actual < expected,
        ComparisonOperator::Lte => actual <= expected,
        ComparisonOperator::Gt => actual > expected,
        ComparisonOperator::Gte => actual >= expected,
        // 大小写不敏感的子串匹配
        ComparisonOperator::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
