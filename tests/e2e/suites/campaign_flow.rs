//! 活动全链路测试套件
//!
//! 测试从活动创建到投递完成的完整链路：工单受理、投递任务上线、
//! 模拟发送与沟通日志落库。

use crate::assert_campaign_logged;
use crate::data::*;
use crate::helpers::*;
use crate::setup::TestEnvironment;
use std::collections::HashSet;
use std::time::Duration;

/// 摄入标准受众并等待全部成员落库
async fn seed_and_wait(env: &TestEnvironment) -> AudienceMix {
    let mix = ScenarioBuilder::new(&env.api)
        .seeded_audience()
        .await
        .unwrap();

    let waits = mix
        .ids()
        .into_iter()
        .map(|id| async move { env.wait_for_customer(&id, Duration::from_secs(10)).await });
    for result in futures::future::join_all(waits).await {
        result.unwrap();
    }

    mix
}

#[cfg(test)]
mod campaign_delivery_tests {
    use super::*;

    /// 活动创建到沟通日志的端到端链路
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_campaign_end_to_end() {
        let env = TestEnvironment::setup().await.unwrap();
        let mix = seed_and_wait(&env).await;

        // 预估与创建用同一棵规则树，人数应一致
        let rules = mix.rule_big_spenders();
        let preview = env.api.preview_audience(&rules).await.unwrap();
        assert_eq!(preview, 2);

        let name = campaign_name("高消费召回");
        let ticket = env.api.create_campaign(&name, &rules).await.unwrap();

        // 工单在受理时刻固定为排队中、零计数
        assert_eq!(ticket.name, name);
        assert_eq!(ticket.status, "queued");
        assert_eq!(ticket.audience_size, 2);
        assert_eq!(ticket.sent_count, 0);
        assert_eq!(ticket.failed_count, 0);

        // 投递消费端处理完成后写入沟通日志
        env.wait_for_communication_log(&name, Duration::from_secs(15))
            .await
            .unwrap();

        let log = env.db.latest_communication_log(&name).await.unwrap();
        assert_eq!(log.status, "sent");
        assert_eq!(log.audience_size, 2);
        assert_eq!(log.sent_count, 2);
        assert_eq!(log.failed_count, 0);
        assert_eq!(log.detail_count(), 2);

        // 明细恰好覆盖两个高消费客户
        let detail_ids: HashSet<String> = log.detail_customer_ids().into_iter().collect();
        let expected: HashSet<String> = [
            mix.vip_active.customer_id.clone(),
            mix.vip_rare.customer_id.clone(),
        ]
        .into_iter()
        .collect();
        assert_eq!(detail_ids, expected);
        assert!(log.all_details_have_status("sent"));

        // 历史接口能看到这条日志，并带完整明细
        let history = env.api.list_campaigns().await.unwrap();
        let entry = history
            .iter()
            .find(|l| l.name == name)
            .expect("历史接口应包含新活动");
        assert_eq!(entry.sent_count, 2);
        assert_eq!(entry.delivery_details.len(), 2);
        for detail in &entry.delivery_details {
            assert_eq!(detail.status, "sent");
            assert!(
                detail.message_id.starts_with("msg-"),
                "消息 ID 应有 msg- 前缀: {}",
                detail.message_id
            );
        }

        env.cleanup().await.unwrap();
    }

    /// 投递任务的线格式契约
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_delivery_job_wire_format() {
        let env = TestEnvironment::setup().await.unwrap();
        let mix = seed_and_wait(&env).await;

        let name = campaign_name("线格式");
        env.api
            .create_campaign(&name, &mix.rule_spend_and_rare())
            .await
            .unwrap();

        // 旁路消费投递主题，找到刚发布的任务
        let jobs = env.kafka.consume_delivery_jobs().await.unwrap();
        let job = jobs
            .iter()
            .find(|j| j.campaign_name() == name)
            .expect("投递主题上应有新任务");

        assert_eq!(job.customer_ids, vec![mix.vip_rare.customer_id.clone()]);
        assert_eq!(job.campaign_details["status"], "queued");
        assert_eq!(job.campaign_details["audience_size"], 1);
        assert_eq!(job.campaign_details["sent_count"], 0);

        env.cleanup().await.unwrap();
    }

    /// 零受众活动同样走完链路并落日志
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_zero_audience_campaign_still_logged() {
        let env = TestEnvironment::setup().await.unwrap();
        let mix = seed_and_wait(&env).await;

        let name = campaign_name("零受众");
        let ticket = env
            .api
            .create_campaign(&name, &mix.rule_nobody())
            .await
            .unwrap();
        assert_eq!(ticket.audience_size, 0);

        env.wait_for_communication_log(&name, Duration::from_secs(15))
            .await
            .unwrap();
        assert_campaign_logged!(env.db, &name);

        let log = env.db.latest_communication_log(&name).await.unwrap();
        assert_eq!(log.status, "sent");
        assert_eq!(log.sent_count, 0);
        assert_eq!(log.detail_count(), 0);

        env.cleanup().await.unwrap();
    }

    /// 活动在创建时不落库，日志由消费端一次性写入
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_log_written_only_by_consumer() {
        let env = TestEnvironment::setup().await.unwrap();
        let mix = seed_and_wait(&env).await;

        let name = campaign_name("单次落库");
        env.api
            .create_campaign(&name, &mix.rule_all())
            .await
            .unwrap();

        env.wait_for_communication_log(&name, Duration::from_secs(15))
            .await
            .unwrap();

        // 只有消费端写入的一条，没有创建时的中间状态行
        let logs = env.db.get_communication_logs(&name).await.unwrap();
        assert_eq!(logs.len(), 1, "同名活动应只有一条日志");
        assert_eq!(logs[0].status, "sent");

        env.cleanup().await.unwrap();
    }
}

#[cfg(test)]
mod campaign_validation_tests {
    use super::*;

    /// 创建接口拒绝非法规则并报全量明细
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_create_rejects_invalid_rules() {
        let env = TestEnvironment::setup().await.unwrap();

        let resp = env
            .api
            .post_raw(
                "/api/campaigns/create",
                &serde_json::json!({
                    "name": campaign_name("非法规则"),
                    "rules": TestRules::multiple_problems()
                }),
            )
            .await
            .unwrap();

        assert_eq!(resp.status.as_u16(), 400);
        assert_eq!(resp.code(), "VALIDATION_ERROR");
        assert_eq!(resp.errors().len(), 3);

        env.cleanup().await.unwrap();
    }

    /// 活动名称必填
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_create_requires_name() {
        let env = TestEnvironment::setup().await.unwrap();

        let resp = env
            .api
            .post_raw(
                "/api/campaigns/create",
                &serde_json::json!({ "rules": TestRules::match_all() }),
            )
            .await
            .unwrap();

        assert_eq!(resp.status.as_u16(), 400);
        assert_eq!(resp.code(), "VALIDATION_ERROR");

        env.cleanup().await.unwrap();
    }
}
