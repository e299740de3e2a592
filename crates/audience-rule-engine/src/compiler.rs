//! 规则编译器：把线格式规则树降为谓词树
//!
//! 编译是唯一的校验入口，一次遍历完成全部检查并收集所有问题，
//! 不在第一个错误处停下；只要树上存在任何问题，整次编译失败，
//! 调用方拿到的是完整的问题清单。

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{Result, RuleIssue, RuleValidationError};
use crate::models::{Rule, RuleGroup, RuleNode};
use crate::operators::{AudienceField, Combinator, ComparisonOperator};
use crate::predicate::{Comparison, NumericField, Predicate};

/// 规则组的最大嵌套深度
pub const MAX_RULE_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// RuleCompiler
// ---------------------------------------------------------------------------

/// 规则编译器
///
/// 无状态、可随意复用；`inactive_days` 的时间基准在每次编译时取当前时刻，
/// 测试可通过 [`RuleCompiler::compile_at`] 固定时间基准。
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    max_depth: usize,
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_RULE_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 以当前时刻为时间基准编译
    pub fn compile(&self, group: &RuleGroup) -> Result<Predicate> {
        self.compile_at(group, Utc::now())
    }

    /// 以指定时刻为时间基准编译
    pub fn compile_at(&self, group: &RuleGroup, now: DateTime<Utc>) -> Result<Predicate> {
        // 顶层空规则组表示不设限、匹配全量受众，先于组合器校验短路返回
        if group.rules.is_empty() {
            return Ok(Predicate::True);
        }

        let mut issues = Vec::new();
        let predicate = self.lower_group(group, "", 1, now, &mut issues);

        if let Some(predicate) = predicate
            && issues.is_empty()
        {
            Ok(predicate)
        } else {
            debug!(issue_count = issues.len(), "规则编译失败");
            Err(RuleValidationError::new(issues))
        }
    }

    fn lower_group(
        &self,
        group: &RuleGroup,
        prefix: &str,
        depth: usize,
        now: DateTime<Utc>,
        issues: &mut Vec<RuleIssue>,
    ) -> Option<Predicate> {
        if depth > self.max_depth {
            let path = if prefix.is_empty() { "rules" } else { prefix };
            issues.push(RuleIssue::new(
                path,
                format!("规则嵌套超过最大深度 {}", self.max_depth),
            ));
            return None;
        }

        let combinator = Combinator::from_wire(&group.combinator);
        let mut failed = combinator.is_none();
        if combinator.is_none() {
            issues.push(RuleIssue::new(
                child_path(prefix, "combinator"),
                format!("未知组合器: '{}'（支持 and/or）", group.combinator),
            ));
        }

        // 顶层空组在 compile_at 已短路，走到这里的空组一定是嵌套组
        if group.rules.is_empty() {
            issues.push(RuleIssue::new(child_path(prefix, "rules"), "嵌套规则组为空"));
            return None;
        }

        let mut children = Vec::with_capacity(group.rules.len());
        for (index, node) in group.rules.iter().enumerate() {
            let node_path = child_path(prefix, &format!("rules[{}]", index));
            match node {
                RuleNode::Group(inner) => {
                    match self.lower_group(inner, &node_path, depth + 1, now, issues) {
                        Some(child) => children.push(child),
                        None => failed = true,
                    }
                }
                RuleNode::Rule(rule) => match self.lower_rule(rule, &node_path, now, issues) {
                    Some(child) => children.push(child),
                    None => failed = true,
                },
                RuleNode::Other(_) => {
                    issues.push(RuleIssue::new(node_path, "无法识别的规则节点"));
                    failed = true;
                }
            }
        }

        if failed {
            return None;
        }

        match combinator {
            Some(Combinator::And) => Some(Predicate::And(children)),
            Some(Combinator::Or) => Some(Predicate::Or(children)),
            None => None,
        }
    }

    fn lower_rule(
        &self,
        rule: &Rule,
        node_path: &str,
        now: DateTime<Utc>,
        issues: &mut Vec<RuleIssue>,
    ) -> Option<Predicate> {
        let mut failed = false;

        let field = AudienceField::from_wire(&rule.field);
        if field.is_none() {
            issues.push(RuleIssue::new(
                child_path(node_path, "field"),
                format!("未知字段: '{}'", rule.field),
            ));
            failed = true;
        }

        let operator = ComparisonOperator::from_symbol(&rule.operator);
        if operator.is_none() {
            issues.push(RuleIssue::new(
                child_path(node_path, "operator"),
                format!("未知操作符: '{}'", rule.operator),
            ));
            failed = true;
        }

        let raw = rule.value.as_str();
        if raw.is_none() {
            issues.push(RuleIssue::new(
                child_path(node_path, "value"),
                "条件值必须是字符串",
            ));
            failed = true;
        }

        // 数值字段的值必须能解析成有限数；字段未知时无从判断，跳过
        let mut number = None;
        if let Some(field) = field
            && field.is_numeric()
            && let Some(raw) = raw
        {
            number = raw.trim().parse::<f64>().ok().filter(|n| n.is_finite());
            if number.is_none() {
                issues.push(RuleIssue::new(
                    child_path(node_path, "value"),
                    format!("条件值 '{}' 无法解析为数字", raw),
                ));
                failed = true;
            }
        }

        if failed {
            return None;
        }
        let (Some(field), Some(operator), Some(raw)) = (field, operator, raw) else {
            return None;
        };

        match field {
            AudienceField::Email => Some(Predicate::Compare(Comparison::EmailText {
                op: operator,
                value: raw.to_string(),
            })),
            AudienceField::InactiveDays => {
                let days = number?;
                if operator == ComparisonOperator::Gt {
                    // inactive_days > N 改写为「最近访问早于 now - N 天」，天数向零取整
                    let cutoff = now - Duration::days(days.trunc() as i64);
                    Some(Predicate::Compare(Comparison::LastVisitBefore { cutoff }))
                } else {
                    // 其余操作符按普通 metadata 数值字段下推；该字段从不落库，
                    // 求值时读不到值、恒不匹配，与既有线上行为保持一致
                    Some(Predicate::Compare(Comparison::MetadataNumber {
                        field: NumericField::InactiveDays,
                        op: operator,
                        value: days,
                    }))
                }
            }
            AudienceField::TotalSpend => Some(Predicate::Compare(Comparison::MetadataNumber {
                field: NumericField::TotalSpend,
                op: operator,
                value: number?,
            })),
            AudienceField::VisitCount => Some(Predicate::Compare(Comparison::MetadataNumber {
                field: NumericField::VisitCount,
                op: operator,
                value: number?,
            })),
        }
    }
}

fn child_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
