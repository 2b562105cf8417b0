//! Bearer 认证中间件与已认证主体

use crate::{error::AppError, middleware::AppState, models::user::UserResponse};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 已认证主体（由 validate_access_token 产生一次，附加到请求扩展）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

impl From<&UserResponse> for Principal {
    fn from(user: &UserResponse) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 Principal
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取 Bearer 令牌（scheme 不区分大小写）
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            let (scheme, token) = s.split_once(' ')?;
            let token = token.trim();
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
                Some(token.to_string())
            } else {
                None
            }
        })
        .ok_or(AppError::Unauthorized)
}

/// 认证中间件 - 必须携带有效访问令牌
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())?;

    // 校验令牌并确认用户仍然有效
    let user = state.credentials.validate_access_token(&token).await?;

    req.extensions_mut().insert(Principal::from(&user));

    Ok(next.run(req).await)
}
