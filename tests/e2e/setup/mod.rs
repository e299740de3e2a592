//! 测试环境设置模块
//!
//! 提供测试环境的初始化、服务健康检查和清理功能。

mod environment;

pub use cleanup::TestCleanup;
pub use environment::{TestEnvConfig, TestEnvironment};
pub use services::{ServiceHealth, ServiceManager};
