//! 认证服务：注册、登录、令牌校验、令牌刷新、登出
//!
//! 服务本身不持有可变状态，构造后以 `Arc` 在各请求间共享。
//! 所有用户目录和会话存储调用都受 `store_timeout` 约束，超时返回 `ServiceUnavailable`。

use crate::{
    auth::{jwt::TokenCodec, middleware::Principal, password::PasswordHasher},
    config::SecurityConfig,
    error::{AppError, TokenError},
    models::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, TokenPair},
        user::{NewUser, User, UserResponse},
    },
    repository::UserDirectory,
    session::SessionStore,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

/// 凭证能力接口，HTTP 与 gRPC 适配层只依赖它
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError>;

    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError>;

    async fn validate_access_token(&self, token: &str) -> Result<UserResponse, AppError>;

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, AppError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<UserResponse, AppError>;

    async fn logout(&self, principal: &Principal) -> Result<(), AppError>;
}

pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<TokenCodec>,
    hasher: PasswordHasher,
    policy: SecurityConfig,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        tokens: Arc<TokenCodec>,
        hasher: PasswordHasher,
        policy: SecurityConfig,
    ) -> Self {
        Self {
            directory,
            sessions,
            tokens,
            hasher,
            policy,
        }
    }

    fn access_ttl(&self) -> Duration {
        self.policy.access_token_ttl()
    }

    fn refresh_ttl(&self) -> Duration {
        self.policy.refresh_token_ttl()
    }

    /// 带超时执行一次存储调用
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>> + Send,
    {
        match tokio::time::timeout(self.policy.store_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.policy.store_timeout_ms,
                    "Store call timed out"
                );
                Err(AppError::ServiceUnavailable(format!("{} timed out", operation)))
            }
        }
    }

    /// 按 ID 取活跃用户；不存在或已停用都视为 UserNotFound
    async fn active_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.bounded("user lookup", self.directory.find_by_id(user_id))
            .await?
            .filter(|user| user.active)
            .ok_or(AppError::UserNotFound)
    }

    /// 在阻塞线程池上计算密码哈希
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// 在阻塞线程池上校验密码；没有可比对的哈希时对占位哈希做一次等价计算
    async fn check_password(
        &self,
        password: String,
        stored_hash: Option<String>,
    ) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }

    fn issue_access(&self, user: &User) -> Result<String, AppError> {
        self.tokens
            .issue(&user.id.to_string(), &user.email, self.access_ttl())
    }

    fn issue_refresh(&self, user: &User) -> Result<String, AppError> {
        self.tokens
            .issue(&user.id.to_string(), &user.email, self.refresh_ttl())
    }
}

#[async_trait]
impl CredentialService for AuthService {
    /// 注册新用户（不签发令牌）
    async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError> {
        req.validate()?;
        PasswordHasher::validate_password_policy(&req.password, &self.policy)?;

        if self
            .bounded("email lookup", self.directory.email_exists(&req.email))
            .await?
        {
            return Err(AppError::UserExists);
        }

        let password_hash = self.hash_password(req.password).await?;

        let user = self
            .bounded(
                "user create",
                self.directory.create(NewUser {
                    email: req.email,
                    password_hash,
                    first_name: req.first_name,
                    last_name: req.last_name,
                }),
            )
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(UserResponse::from(user))
    }

    /// 用户登录
    async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user = self
            .bounded("user lookup", self.directory.find_by_email(&req.email))
            .await?;

        // 不存在、已停用、密码错误三种情况对外不可区分，都要付出一次哈希计算
        let stored_hash = user
            .as_ref()
            .filter(|user| user.active)
            .map(|user| user.password_hash.clone());
        let password_matches = self.check_password(req.password, stored_hash).await?;

        let user = match user {
            Some(user) if user.active && password_matches => user,
            Some(user) if user.active => {
                metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
                tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
                return Err(AppError::InvalidCredentials);
            }
            Some(user) => {
                metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
                tracing::debug!(user_id = %user.id, "Login rejected: account inactive");
                return Err(AppError::InvalidCredentials);
            }
            None => {
                metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
                tracing::debug!("Login rejected: unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let access_token = self.issue_access(&user)?;
        let refresh_token = self.issue_refresh(&user)?;

        // 覆盖写入，旧的刷新令牌随即失效
        self.bounded(
            "session put",
            self.sessions.put(user.id, &refresh_token, self.refresh_ttl()),
        )
        .await?;

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in: self.policy.access_token_exp_secs,
        })
    }

    /// 校验访问令牌（无状态，不查询会话存储）
    async fn validate_access_token(&self, token: &str) -> Result<UserResponse, AppError> {
        let claims = self.tokens.parse(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::UserNotFound)?;
        let user = self.active_user(user_id).await?;

        Ok(UserResponse::from(user))
    }

    /// 刷新令牌
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let result = self.refresh(refresh_token).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::InvalidToken(TokenError::Superseded)) => "superseded",
            Err(AppError::InvalidToken(_)) => "invalid",
            Err(_) => "failure",
        };
        metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);

        result
    }

    /// 获取用户资料
    async fn get_profile(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        let user = self.active_user(user_id).await?;
        Ok(UserResponse::from(user))
    }

    /// 登出：删除会话，已发放的刷新令牌全部失效
    async fn logout(&self, principal: &Principal) -> Result<(), AppError> {
        self.bounded("session delete", self.sessions.delete(principal.user_id))
            .await?;

        tracing::info!(user_id = %principal.user_id, "User logged out");
        Ok(())
    }
}

impl AuthService {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.tokens.parse(refresh_token)?;

        // 签名有效但主体不是 UUID 的令牌不可能由本服务签发
        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken(TokenError::Malformed))?;

        let stored = self
            .bounded("session get", self.sessions.get(user_id))
            .await?;
        if stored.as_deref() != Some(refresh_token) {
            tracing::debug!(%user_id, "Refresh rejected: token superseded");
            return Err(AppError::InvalidToken(TokenError::Superseded));
        }

        let user = self.active_user(user_id).await?;
        let access_token = self.issue_access(&user)?;

        let refresh_token = if self.policy.rotate_refresh_tokens {
            let rotated = self.issue_refresh(&user)?;
            self.bounded(
                "session put",
                self.sessions.put(user.id, &rotated, self.refresh_ttl()),
            )
            .await?;
            rotated
        } else {
            refresh_token.to_string()
        };

        tracing::debug!(user_id = %user.id, "Tokens refreshed");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.policy.access_token_exp_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock, repository::InMemoryUserDirectory, session::InMemorySessionStore,
    };
    use secrecy::Secret;

    /// 永不完成的会话存储，用于超时路径
    struct StalledStore;

    #[async_trait]
    impl SessionStore for StalledStore {
        async fn put(&self, _: Uuid, _: &str, _: Duration) -> Result<(), AppError> {
            std::future::pending().await
        }

        async fn get(&self, _: Uuid) -> Result<Option<String>, AppError> {
            std::future::pending().await
        }

        async fn delete(&self, _: Uuid) -> Result<(), AppError> {
            std::future::pending().await
        }
    }

    fn policy() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: Secret::new("test_secret_key_32_characters_long!".to_string()),
            access_token_exp_secs: 900,
            refresh_token_exp_secs: 604800,
            rotate_refresh_tokens: true,
            store_timeout_ms: 50,
            password_min_length: 6,
            password_require_uppercase: false,
            password_require_digit: false,
            password_require_special: false,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        }
    }

    fn service_with(sessions: Arc<dyn SessionStore>) -> AuthService {
        let clock = Arc::new(ManualClock::starting_now());
        let policy = policy();
        AuthService::new(
            Arc::new(InMemoryUserDirectory::new(clock.clone())),
            sessions,
            Arc::new(TokenCodec::from_config(&policy, clock).unwrap()),
            PasswordHasher::from_config(&policy).unwrap(),
            policy,
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "pw123456".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let clock = Arc::new(ManualClock::starting_now());
        let service = service_with(Arc::new(InMemorySessionStore::new(clock)));

        let result = service.register(register_request("nope")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stalled_store_maps_to_unavailable() {
        let service = service_with(Arc::new(StalledStore));
        service.register(register_request("a@x.com")).await.unwrap();

        let result = service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "pw123456".to_string(),
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
