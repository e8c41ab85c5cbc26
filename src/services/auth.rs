use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::User,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 只负责校验外部认证服务签发的 JWT；身份本身不在本服务内管理
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,               // 用户ID
    pub exp: i64,                  // 过期时间
    pub iat: i64,                  // 签发时间
    pub email: Option<String>,     // 邮箱
}

/// 有效令牌携带的身份，用户可能尚未注册
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::unauthorized("Invalid token"))
            }
        }
    }

    /// 签发令牌，仅用于本地开发和测试
    pub fn issue_token(&self, user_id: &str, email: Option<&str>, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            email: email.map(str::to_string),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// 认证中间件解析出的已注册且已审核的用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match parts.extensions.get::<User>() {
            Some(user) if user.approved => Ok(CurrentUser(user.clone())),
            Some(_) => Err(AppError::forbidden("Your account is pending approval.")),
            None if parts.extensions.get::<Identity>().is_some() => {
                Err(AppError::unauthorized("Account is not registered"))
            }
            None => Err(AppError::unauthorized("Authentication required")),
        }
    }
}

pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(&Config::default())
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = service();
        let token = auth.issue_token("user-1", Some("a@example.com"), Duration::hours(1)).unwrap();
        let claims = auth.verify_jwt(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_rejects_expired_and_foreign_tokens() {
        let auth = service();
        let expired = auth.issue_token("user-1", None, Duration::hours(-2)).unwrap();
        assert!(auth.verify_jwt(&expired).is_err());

        let other = AuthService { jwt_secret: "other-secret".to_string() };
        let foreign = other.issue_token("user-1", None, Duration::hours(1)).unwrap();
        assert!(auth.verify_jwt(&foreign).is_err());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
