//! 规则引擎吞吐测试
//!
//! 不经过 HTTP，直接压编译与求值两个阶段。和服务无关，
//! 只为确认规则引擎不会成为圈选路径的瓶颈。

use super::super::{LoadTestConfig, LoadTestRunner, PerformanceAssertions};
use audience_rules::{AudienceMember, NumericField, Predicate, RuleCompiler, RuleGroup};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(test)]
mod rule_engine_tests {
    use super::*;

    /// 压测用内存成员
    struct BenchMember {
        email: String,
        total_spend: f64,
        visit_count: f64,
        last_visit: DateTime<Utc>,
    }

    impl AudienceMember for BenchMember {
        fn email(&self) -> Option<&str> {
            Some(&self.email)
        }

        fn numeric_field(&self, field: NumericField) -> Option<f64> {
            match field {
                NumericField::TotalSpend => Some(self.total_spend),
                NumericField::VisitCount => Some(self.visit_count),
                NumericField::InactiveDays => None,
            }
        }

        fn last_visit(&self) -> Option<DateTime<Utc>> {
            Some(self.last_visit)
        }
    }

    /// 画像分布可控的合成受众
    fn synthetic_audience(size: usize) -> Vec<BenchMember> {
        (0..size)
            .map(|i| BenchMember {
                email: format!(
                    "member{}@{}.example.com",
                    i,
                    if i % 3 == 0 { "qq" } else { "acme" }
                ),
                total_spend: (i % 20000) as f64,
                visit_count: (i % 30) as f64,
                last_visit: Utc::now() - chrono::Duration::days((i % 180) as i64),
            })
            .collect()
    }

    fn nested_rule() -> RuleGroup {
        serde_json::from_value(serde_json::json!({
            "combinator": "and",
            "rules": [
                {"field": "total_spend", "operator": ">", "value": "5000"},
                {
                    "combinator": "or",
                    "rules": [
                        {"field": "visit_count", "operator": ">=", "value": "10"},
                        {"field": "inactive_days", "operator": ">", "value": "60"},
                        {"field": "email", "operator": "contains", "value": "qq"}
                    ]
                }
            ]
        }))
        .expect("构造压测规则失败")
    }

    /// 规则编译吞吐：并发重复编译嵌套规则组
    #[tokio::test]
    #[ignore = "耗时较长，手动运行"]
    async fn test_rule_compile_throughput() {
        let config = LoadTestConfig {
            concurrent_users: 8,
            duration: Duration::from_secs(10),
            requests_per_second: Some(50_000),
            warmup_duration: Duration::ZERO,
            request_timeout: Duration::from_secs(1),
        };

        let runner = LoadTestRunner::new(config.clone());
        let group = Arc::new(nested_rule());

        let metrics = runner
            .run(move || {
                let group = group.clone();
                async move {
                    let start = Instant::now();
                    RuleCompiler::new()
                        .compile(&group)
                        .map_err(|e| e.to_string())?;
                    Ok(start.elapsed())
                }
            })
            .await;

        // 编译是纯内存操作，吞吐应远高于任何接口目标
        PerformanceAssertions::assert_success_rate(&metrics, 100.0);
        PerformanceAssertions::assert_throughput(&metrics, config.duration, 1_000.0);
    }

    /// 批量圈选吞吐：编译一次，反复对一万名成员求值
    #[tokio::test]
    #[ignore = "耗时较长，手动运行"]
    async fn test_audience_scan_throughput() {
        let audience = Arc::new(synthetic_audience(10_000));
        let predicate: Arc<Predicate> = Arc::new(
            RuleCompiler::new()
                .compile(&nested_rule())
                .expect("编译压测规则失败"),
        );

        let config = LoadTestConfig {
            concurrent_users: 4,
            duration: Duration::from_secs(10),
            requests_per_second: None,
            warmup_duration: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
        };

        let runner = LoadTestRunner::new(config.clone());

        let metrics = runner
            .run(move || {
                let audience = audience.clone();
                let predicate = predicate.clone();
                async move {
                    let start = Instant::now();
                    let matched = audience
                        .iter()
                        .filter(|member| predicate.matches(*member))
                        .count();
                    if matched == 0 {
                        return Err("圈选结果为空，合成受众分布异常".to_string());
                    }
                    Ok(start.elapsed())
                }
            })
            .await;

        // 单次任务扫描一万名成员
        PerformanceAssertions::assert_success_rate(&metrics, 100.0);
        PerformanceAssertions::assert_p99_latency(&metrics, 100.0);
    }
}
