//! JWT Token 处理
//!
//! 摄入和活动接口只接受携带有效 Bearer Token 的请求。
//! 本服务不做登录，Token 由外部身份系统签发；`issue_token`
//! 保留给测试和运维脚本使用。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crm_shared::config::AuthConfig;

use crate::error::ApiError;

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 操作者 ID
    pub sub: String,
    /// 操作者邮箱
    pub email: Option<String>,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    issuer: String,
    expires_in_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            issuer: config.jwt_issuer.clone(),
            expires_in_secs: config.jwt_expires_in_secs,
            encoding_key,
            decoding_key,
        }
    }

    /// 签发 JWT Token，返回 Token 与过期时间戳
    pub fn issue_token(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in_secs);

        let claims = Claims {
            sub: subject.to_string(),
            email: email.map(|s| s.to_string()),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 签发失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    ///
    /// 返回解析后的 Claims，Token 无效或过期时返回未授权错误。
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        ApiError::Unauthorized("Token 已过期".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        ApiError::Unauthorized("无效的 Token".to_string())
                    }
                    _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }
}
