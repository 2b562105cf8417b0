//! 认证系统库
//! 凭证生命周期：注册、登录、令牌校验与刷新

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod services;
pub mod session;
pub mod telemetry;
