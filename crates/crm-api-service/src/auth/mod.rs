//! 认证模块
//!
//! 提供 JWT Token 的签发与验证，登录流程由外部身份系统负责。

mod jwt;

pub use jwt::{Claims, JwtManager};
