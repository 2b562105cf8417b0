//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::{extract_token, Principal},
    error::AppError,
    extract::AppJson,
    middleware::AppState,
    models::auth::*,
    response::{created, ok},
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use std::sync::Arc;

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.credentials.register(req).await?;

    Ok(created(user, "User registered successfully"))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.credentials.login(req).await?;

    Ok(ok(response, "Login successful"))
}

/// 刷新令牌
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token_pair = state
        .credentials
        .refresh_access_token(&req.refresh_token)
        .await?;

    Ok(ok(token_pair, "Token refreshed successfully"))
}

/// 校验访问令牌（不经过认证中间件，直接读取 Authorization 头）
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = extract_token(&headers)?;

    let user = state.credentials.validate_access_token(&token).await?;

    Ok(ok(user, "Token is valid"))
}

/// 获取当前用户资料
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.credentials.get_profile(principal.user_id).await?;

    Ok(ok(user, "Profile retrieved successfully"))
}

/// 登出
pub async fn logout(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    state.credentials.logout(&principal).await?;

    Ok(ok((), "Logged out successfully"))
}
