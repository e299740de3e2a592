//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射。摄入与活动路由受认证中间件保护，
//! 客户查询保持公开，前缀划分见 `middleware::auth`。

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 构建 /api 下的全部业务路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(ingestion_routes())
        .merge(campaign_routes())
        .merge(customer_routes())
}

/// 数据摄入路由
fn ingestion_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ingestion/customers",
            post(handlers::ingestion::ingest_customers),
        )
        .route("/ingestion/orders", post(handlers::ingestion::ingest_orders))
}

/// 营销活动路由
fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(handlers::campaign::list_campaigns))
        .route(
            "/campaigns/create",
            post(handlers::campaign::create_campaign),
        )
        .route(
            "/campaigns/preview",
            post(handlers::campaign::preview_audience),
        )
}

/// 客户查询路由
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(handlers::customer::list_customers))
        .route(
            "/customers/{customer_id}",
            get(handlers::customer::get_customer),
        )
}
