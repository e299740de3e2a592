//! CRM 对外 API 服务
//!
//! 提供数据摄入、受众预估、活动创建与查询的 REST API。
//!
//! ## 核心功能
//!
//! - **数据摄入**：客户/订单批量接收，校验通过后整批入队，异步落库
//! - **受众预估**：把规则树编译为谓词，对客户快照求命中人数
//! - **活动创建**：圈选受众并生成投递任务，发送结果由消费端落库
//! - **查询接口**：客户列表/详情、活动历史
//!
//! ## 模块结构
//!
//! - `auth`: JWT 签发与验证
//! - `dispatch`: 活动派发服务（编译规则、圈选受众、任务入队）
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证中间件
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod auth;
pub mod dispatch;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// 重新导出核心类型
pub use auth::{Claims, JwtManager};
pub use dispatch::CampaignDispatcher;
pub use dto::{ApiResponse, AudiencePreview, IngestAccepted};
pub use error::{ApiError, RecordIssue, Result};
pub use state::AppState;
