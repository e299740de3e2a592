//! CRM 对外 API 服务
//!
//! 提供数据摄入、受众预估、活动创建与查询的 REST API。

use std::time::Duration;

use axum::{Json, Router, http::HeaderValue, middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crm_api_service::{auth::JwtManager, middleware::auth_middleware, routes, state::AppState};
use crm_shared::{config::AppConfig, database::Database, kafka::SharedProducer, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 统一加载配置：config/default.toml + 环境配置 + 服务配置 + CRM_ 环境变量
    let config = AppConfig::load("crm-api-service").unwrap_or_default();
    observability::init_tracing(&config.service_name, &config.observability)?;

    info!("Starting crm-api-service on {}", config.server_addr());

    // JWT 密钥：生产环境必须通过配置或环境变量注入，不可使用默认值
    if config.is_production() && config.auth.jwt_secret.contains("change-in-production") {
        anyhow::bail!("生产环境必须设置 CRM_AUTH_JWT_SECRET");
    }

    // 初始化基础设施：数据库立即连接并跑迁移，Kafka 生产者惰性初始化
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let producer = SharedProducer::new(config.kafka.clone());
    let jwt = JwtManager::new(&config.auth);

    let state = AppState::new(db.pool().clone(), producer, jwt);

    // CORS 配置：通过 CRM_CORS_ORIGINS 环境变量控制允许的来源
    let allowed_origins =
        std::env::var("CRM_CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string());

    let cors = if allowed_origins == "*" {
        if config.is_production() {
            warn!("CRM_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db;
                move || readiness_check(db_for_ready.clone())
            }),
        )
        // 认证中间件：验证 JWT Token，只拦截摄入与活动路由
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // CORS 在认证之外，预检请求不需要携带 Token
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止，本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "crm-api-service"
    }))
}

/// 就绪探针：检查数据库连接是否可用
///
/// Kafka 生产者是惰性初始化的，不参与就绪检查，
/// 首次发送失败会以依赖错误的形式反馈给调用方。
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "crm-api-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
