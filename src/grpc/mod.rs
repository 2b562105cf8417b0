//! gRPC 适配层（package `auth.v1`）
//!
//! 消息类型与 `auth.v1.AuthService` 的线上格式一致，适配器把每个 RPC
//! 映射到 `CredentialService`。业务失败不作为 gRPC 状态返回，而是写入
//! 响应体的 `success`/`valid`、`message` 与 `error_code` 字段。

use crate::{
    auth::middleware::Principal,
    error::AppError,
    models::{
        auth::{LoginRequest as HttpLoginRequest, RegisterRequest as HttpRegisterRequest},
        user::UserResponse,
    },
    services::CredentialService,
};
use std::sync::Arc;

/// 用户公开视图
#[derive(Clone, PartialEq, prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub email: String,
    #[prost(string, tag = "3")]
    pub first_name: String,
    #[prost(string, tag = "4")]
    pub last_name: String,
    /// unix seconds
    #[prost(int64, tag = "5")]
    pub created_at: i64,
    #[prost(int64, tag = "6")]
    pub updated_at: i64,
    #[prost(bool, tag = "7")]
    pub active: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RegisterRequest {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    pub password: String,
    #[prost(string, tag = "3")]
    pub first_name: String,
    #[prost(string, tag = "4")]
    pub last_name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RegisterResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(string, tag = "4")]
    pub error_code: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoginResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub token: String,
    #[prost(string, tag = "3")]
    pub refresh_token: String,
    #[prost(message, optional, tag = "4")]
    pub user: Option<User>,
    #[prost(string, tag = "5")]
    pub message: String,
    #[prost(string, tag = "6")]
    pub error_code: String,
    #[prost(uint64, tag = "7")]
    pub expires_in: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValidateTokenRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValidateTokenResponse {
    #[prost(bool, tag = "1")]
    pub valid: bool,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(string, tag = "4")]
    pub error_code: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RefreshTokenRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RefreshTokenResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub token: String,
    #[prost(string, tag = "3")]
    pub refresh_token: String,
    #[prost(string, tag = "4")]
    pub message: String,
    #[prost(string, tag = "5")]
    pub error_code: String,
    #[prost(uint64, tag = "6")]
    pub expires_in: u64,
}

/// 资料查询携带访问令牌，由适配器先校验得到主体
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetUserProfileRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetUserProfileResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(string, tag = "4")]
    pub error_code: String,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at.timestamp(),
            updated_at: user.updated_at.timestamp(),
            active: user.active,
        }
    }
}

/// 失败时写入响应的 (message, error_code)
fn failure(rpc: &'static str, err: &AppError) -> (String, String) {
    if err.is_internal() {
        tracing::error!(rpc, code = err.code(), error = %err, "RPC failed with internal error");
    } else {
        tracing::debug!(rpc, code = err.code(), error = %err, "RPC rejected");
    }
    (err.user_message(), err.code().to_string())
}

/// `auth.v1.AuthService` 的处理实现
#[derive(Clone)]
pub struct GrpcAuthAdapter {
    service: Arc<dyn CredentialService>,
}

impl GrpcAuthAdapter {
    pub fn new(service: Arc<dyn CredentialService>) -> Self {
        Self { service }
    }

    pub async fn register(&self, req: RegisterRequest) -> RegisterResponse {
        let result = self
            .service
            .register(HttpRegisterRequest {
                email: req.email,
                password: req.password,
                first_name: req.first_name,
                last_name: req.last_name,
            })
            .await;

        match result {
            Ok(user) => RegisterResponse {
                success: true,
                user: Some(user.into()),
                message: "User registered successfully".to_string(),
                error_code: String::new(),
            },
            Err(e) => {
                let (message, error_code) = failure("Register", &e);
                RegisterResponse {
                    success: false,
                    user: None,
                    message,
                    error_code,
                }
            }
        }
    }

    pub async fn login(&self, req: LoginRequest) -> LoginResponse {
        let result = self
            .service
            .login(HttpLoginRequest {
                email: req.email,
                password: req.password,
            })
            .await;

        match result {
            Ok(resp) => LoginResponse {
                success: true,
                token: resp.access_token,
                refresh_token: resp.refresh_token,
                user: Some(resp.user.into()),
                message: "Login successful".to_string(),
                error_code: String::new(),
                expires_in: resp.expires_in,
            },
            Err(e) => {
                let (message, error_code) = failure("Login", &e);
                LoginResponse {
                    message,
                    error_code,
                    ..Default::default()
                }
            }
        }
    }

    pub async fn validate_token(&self, req: ValidateTokenRequest) -> ValidateTokenResponse {
        match self.service.validate_access_token(&req.token).await {
            Ok(user) => ValidateTokenResponse {
                valid: true,
                user: Some(user.into()),
                message: "Token is valid".to_string(),
                error_code: String::new(),
            },
            Err(e) => {
                let (message, error_code) = failure("ValidateToken", &e);
                ValidateTokenResponse {
                    valid: false,
                    user: None,
                    message,
                    error_code,
                }
            }
        }
    }

    pub async fn refresh_token(&self, req: RefreshTokenRequest) -> RefreshTokenResponse {
        match self.service.refresh_access_token(&req.refresh_token).await {
            Ok(pair) => RefreshTokenResponse {
                success: true,
                token: pair.access_token,
                refresh_token: pair.refresh_token,
                message: "Token refreshed successfully".to_string(),
                error_code: String::new(),
                expires_in: pair.expires_in,
            },
            Err(e) => {
                let (message, error_code) = failure("RefreshToken", &e);
                RefreshTokenResponse {
                    message,
                    error_code,
                    ..Default::default()
                }
            }
        }
    }

    pub async fn get_user_profile(&self, req: GetUserProfileRequest) -> GetUserProfileResponse {
        let result = async {
            let validated = self.service.validate_access_token(&req.token).await?;
            let principal = Principal::from(&validated);
            self.service.get_profile(principal.user_id).await
        }
        .await;

        match result {
            Ok(user) => GetUserProfileResponse {
                success: true,
                user: Some(user.into()),
                message: "User profile retrieved successfully".to_string(),
                error_code: String::new(),
            },
            Err(e) => {
                let (message, error_code) = failure("GetUserProfile", &e);
                GetUserProfileResponse {
                    success: false,
                    user: None,
                    message,
                    error_code,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prost::Message;
    use uuid::Uuid;

    #[test]
    fn test_user_conversion_uses_unix_seconds() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user = User::from(UserResponse {
            id,
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        });

        assert_eq!(user.id, id.to_string());
        assert_eq!(user.created_at, now.timestamp());
        assert!(user.active);
    }

    #[test]
    fn test_failure_response_encodes_error_code() {
        let resp = ValidateTokenResponse {
            valid: false,
            user: None,
            message: "Token has expired".to_string(),
            error_code: "EXPIRED_TOKEN".to_string(),
        };

        let decoded = ValidateTokenResponse::decode(resp.encode_to_vec().as_slice()).unwrap();
        assert!(!decoded.valid);
        assert_eq!(decoded.error_code, "EXPIRED_TOKEN");
    }
}
