//! 统一错误模型
//! 定义所有错误类型、稳定错误码与 HTTP 状态映射

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::response::{ApiResponse, ErrorInfo};

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 令牌校验失败的具体原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token superseded")]
    Superseded,
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid token: {0}")]
    InvalidToken(TokenError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 稳定错误码（对外契约）
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => "UNAUTHORIZED",
            AppError::UserExists => "ALREADY_EXISTS",
            AppError::UserNotFound => "NOT_FOUND",
            AppError::InvalidToken(TokenError::Expired) => "EXPIRED_TOKEN",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::SessionStore(_) | AppError::Config(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// 获取 HTTP 状态码（由错误码一一决定）
    pub fn status_code(&self) -> StatusCode {
        status_for_code(self.code())
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::UserExists => "User already exists".to_string(),
            AppError::UserNotFound => "User not found".to_string(),
            AppError::InvalidToken(TokenError::Expired) => "Token has expired".to_string(),
            AppError::InvalidToken(_) => "Invalid token".to_string(),
            AppError::Unauthorized => "Authorization header required".to_string(),
            AppError::Validation(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::SessionStore(_) | AppError::Config(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// 是否属于基础设施故障（需要完整日志）
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }

    // 便捷方法
    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }

    pub fn unavailable(msg: &str) -> Self {
        AppError::ServiceUnavailable(msg.to_string())
    }
}

/// 错误码到 HTTP 状态码的映射
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "UNAUTHORIZED" | "INVALID_TOKEN" | "EXPIRED_TOKEN" => StatusCode::UNAUTHORIZED,
        "FORBIDDEN" => StatusCode::FORBIDDEN,
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "VALIDATION_ERROR" | "BAD_REQUEST" => StatusCode::BAD_REQUEST,
        "ALREADY_EXISTS" | "CONFLICT" => StatusCode::CONFLICT,
        "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<&AppError> for ErrorInfo {
    fn from(err: &AppError) -> Self {
        ErrorInfo {
            code: err.code().to_string(),
            message: err.user_message(),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 基础设施错误记录完整上下文，业务错误只记调试日志
        if self.is_internal() {
            tracing::error!(
                code = self.code(),
                error = %self,
                "Request failed with internal error"
            );
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body: ApiResponse<()> = ApiResponse::failure(ErrorInfo::from(&self));
        (status, Json(body)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::SessionStore(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// 请求体缺失、格式错误或超出大小限制
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(
            status = %rejection.status(),
            reason = %rejection.body_text(),
            "Rejected request body"
        );
        AppError::BadRequest("Invalid request body".to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::InvalidToken(e)
    }
}
