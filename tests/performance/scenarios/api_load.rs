//! API 负载测试场景
//!
//! 测试 REST 接口在高并发下的表现：客户查询、受众预估与摄入受理。

use super::super::{LoadTestConfig, LoadTestRunner, PerformanceAssertions};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[cfg(test)]
mod api_load_tests {
    use super::*;

    fn base_url() -> String {
        std::env::var("API_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
    }

    /// 服务端没有登录接口，压测客户端用开发默认密钥自签 Token
    fn auth_token() -> String {
        #[derive(serde::Serialize)]
        struct Claims {
            sub: String,
            email: Option<String>,
            iat: i64,
            exp: i64,
            iss: String,
        }

        let secret = std::env::var("CRM_AUTH_JWT_SECRET")
            .unwrap_or_else(|_| "crm-api-secret-key-change-in-production".to_string());
        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "crm-api-service".to_string());
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "perf-harness".to_string(),
            email: None,
            iat: now,
            exp: now + 3600,
            iss: issuer,
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("签发压测 Token 失败")
    }

    /// 客户列表查询负载测试（公开接口）
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_customer_list_load() {
        let config = LoadTestConfig {
            concurrent_users: 100,
            duration: Duration::from_secs(30),
            requests_per_second: Some(500),
            warmup_duration: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        };

        let runner = LoadTestRunner::new(config.clone());
        let client = reqwest::Client::new();
        let base_url = base_url();

        let metrics = runner
            .run(move || {
                let client = client.clone();
                let url = format!("{}/api/customers", base_url);
                async move {
                    let start = Instant::now();
                    let response = client.get(&url).send().await;
                    let latency = start.elapsed();

                    match response {
                        Ok(resp) if resp.status().is_success() => Ok(latency),
                        Ok(resp) => Err(format!("HTTP {}", resp.status())),
                        Err(e) => Err(e.to_string()),
                    }
                }
            })
            .await;

        PerformanceAssertions::assert_success_rate(&metrics, 99.9);
        PerformanceAssertions::assert_p99_latency(&metrics, 200.0);
        PerformanceAssertions::assert_throughput(&metrics, config.duration, 100.0);
    }

    /// 受众预估负载测试
    ///
    /// 每个请求都走一遍规则编译加全量圈选，是读路径里最重的接口。
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_audience_preview_load() {
        let config = LoadTestConfig {
            concurrent_users: 50,
            duration: Duration::from_secs(30),
            requests_per_second: Some(200),
            warmup_duration: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        };

        let runner = LoadTestRunner::new(config.clone());
        let client = reqwest::Client::new();
        let base_url = base_url();
        let token = auth_token();

        let metrics = runner
            .run(move || {
                let client = client.clone();
                let url = format!("{}/api/campaigns/preview", base_url);
                let token = token.clone();
                async move {
                    let start = Instant::now();
                    let response = client
                        .post(&url)
                        .bearer_auth(&token)
                        .json(&serde_json::json!({
                            "rules": {
                                "combinator": "and",
                                "rules": [
                                    {"field": "total_spend", "operator": ">", "value": "5000"},
                                    {
                                        "combinator": "or",
                                        "rules": [
                                            {"field": "visit_count", "operator": ">=", "value": "3"},
                                            {"field": "inactive_days", "operator": ">", "value": "30"}
                                        ]
                                    }
                                ]
                            }
                        }))
                        .send()
                        .await;
                    let latency = start.elapsed();

                    match response {
                        Ok(resp) if resp.status().is_success() => Ok(latency),
                        Ok(resp) => Err(format!("HTTP {}", resp.status())),
                        Err(e) => Err(e.to_string()),
                    }
                }
            })
            .await;

        PerformanceAssertions::assert_success_rate(&metrics, 99.5);
        PerformanceAssertions::assert_p99_latency(&metrics, 500.0);
    }

    /// 摄入受理负载测试
    ///
    /// 只压校验加发布的受理路径，不等待异步落库；客户 ID 在
    /// 固定池里轮转，落库侧退化为幂等 upsert。
    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_ingestion_accept_load() {
        let config = LoadTestConfig {
            concurrent_users: 50,
            duration: Duration::from_secs(30),
            requests_per_second: Some(100),
            warmup_duration: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        };

        let runner = LoadTestRunner::new(config.clone());
        let client = reqwest::Client::new();
        let base_url = base_url();
        let token = auth_token();
        let counter = Arc::new(AtomicU64::new(0));

        let metrics = runner
            .run(move || {
                let client = client.clone();
                let url = format!("{}/api/ingestion/customers", base_url);
                let token = token.clone();
                let seq = counter.fetch_add(1, Ordering::Relaxed);
                async move {
                    let customer_id = format!("test_perf_cust_{}", seq % 1000);
                    let body = serde_json::json!([{
                        "customerId": customer_id,
                        "name": format!("压测客户 {}", seq % 1000),
                        "email": format!("{}@perf.example.com", customer_id),
                        "metadata": {
                            "total_spend": (seq % 10000) as f64,
                            "visit_count": (seq % 50) as i64
                        }
                    }]);

                    let start = Instant::now();
                    let response = client
                        .post(&url)
                        .bearer_auth(&token)
                        .json(&body)
                        .send()
                        .await;
                    let latency = start.elapsed();

                    match response {
                        Ok(resp) if resp.status().is_success() => Ok(latency),
                        Ok(resp) => Err(format!("HTTP {}", resp.status())),
                        Err(e) => Err(e.to_string()),
                    }
                }
            })
            .await;

        PerformanceAssertions::assert_success_rate(&metrics, 99.5);
        PerformanceAssertions::assert_p99_latency(&metrics, 300.0);
    }
}
