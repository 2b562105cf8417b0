//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{error::AppError, middleware::AppState};

/// 存活探针响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    fn from_result(name: &str, result: Result<(), AppError>) -> Self {
        match result {
            Ok(()) => Self {
                name: name.to_string(),
                status: "healthy".to_string(),
                message: None,
            },
            Err(e) => {
                tracing::warn!(check = name, error = %e, "Readiness check failed");
                Self {
                    name: name.to_string(),
                    status: "unhealthy".to_string(),
                    message: Some(e.user_message()),
                }
            }
        }
    }
}

/// 存活探针
/// 快速响应，不检查依赖
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// 就绪探针
/// 检查数据库和会话存储，任一失败返回 503
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let timeout = state.config.security.store_timeout();

    let (database, session_store) = tokio::join!(
        probe(timeout, state.directory.ping()),
        probe(timeout, state.sessions.ping()),
    );

    let checks = vec![
        HealthCheck::from_result("database", database),
        HealthCheck::from_result("session_store", session_store),
    ];

    let ready = checks.iter().all(|c| c.status == "healthy");
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}

async fn probe<F>(timeout: std::time::Duration, fut: F) -> Result<(), AppError>
where
    F: std::future::Future<Output = Result<(), AppError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| Err(AppError::unavailable("probe timed out")))
}
