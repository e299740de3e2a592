//! 数据摄入工作者
//!
//! 消费接口层放行的摄入批次，将客户与订单记录逐条落库。
//! 同时托管一个 DLQ 消费循环，对处理失败的消息按退避策略重投。

use tokio::sync::watch;
use tracing::info;

use crm_shared::{
    config::AppConfig, database::Database, dlq::DlqConsumer, kafka::KafkaProducer, observability,
};
use ingestion_worker::IngestionConsumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 统一加载配置：config/default.toml + 环境配置 + 服务配置 + CRM_ 环境变量
    let config = AppConfig::load("ingestion-worker").unwrap_or_default();
    observability::init_tracing(&config.service_name, &config.observability)?;

    info!("Starting ingestion-worker...");

    let db = Database::connect(&config.database).await?;
    let producer = KafkaProducer::new(&config.kafka)?;

    let consumer = IngestionConsumer::new(&config, db.pool().clone(), producer.clone())?;
    let dlq_consumer = DlqConsumer::new(&config, producer)?;

    // 关闭信号通过 watch channel 广播给所有消费循环
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // DLQ 消费循环在后台运行，与业务消费循环共享关闭信号
    let dlq_handle = tokio::spawn(dlq_consumer.run(shutdown_rx.clone()));

    consumer.run(shutdown_rx).await?;

    let _ = dlq_handle.await;
    db.close().await;
    info!("ingestion-worker shutdown complete");

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
