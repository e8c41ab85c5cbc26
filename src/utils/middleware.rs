use crate::{
    error::AppError,
    services::auth::{bearer_token, Identity},
    state::AppState,
};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tracing::{debug, info, warn};

pub type KeyedRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// 每个客户端 IP 每分钟的请求配额，可一次性用完
pub fn build_rate_limiter(requests_per_minute: u32) -> KeyedRateLimiter {
    let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::dashmap(Quota::per_minute(per_minute))
}

/// 认证中间件
/// 令牌无效时不拒绝请求，由各处理器的提取器决定是否需要认证
pub async fn auth_middleware(
    State(app_state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).map(str::to_string);

    if let Some(token) = token {
        match app_state.auth_service.verify_jwt(&token) {
            Ok(claims) => {
                let identity = Identity {
                    user_id: claims.sub,
                    email: claims.email,
                };
                match app_state.user_service.get_user(&identity.user_id).await {
                    Ok(Some(user)) => {
                        debug!("Authenticated user: {} ({})", user.id, user.email);
                        request.extensions_mut().insert(user);
                    }
                    Ok(None) => {
                        debug!("Token subject {} has no profile yet", identity.user_id);
                    }
                    Err(e) => {
                        warn!("Failed to load user {}: {}", identity.user_id, e);
                        return Err(e);
                    }
                }
                request.extensions_mut().insert(identity);
            }
            Err(e) => {
                debug!("JWT verification failed: {}", e);
            }
        }
    }

    Ok(next.run(request).await)
}

/// 速率限制中间件
pub async fn rate_limit_middleware(
    State(app_state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let client_ip = get_client_ip(&request);

    match app_state.rate_limiter.check_key(&client_ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            warn!("Rate limit exceeded for IP: {}", client_ip);
            Err(AppError::RateLimitExceeded)
        }
    }
}

/// 请求日志中间件
pub async fn request_logging_middleware(request: Request<Body>, next: Next<Body>) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = get_client_ip(&request);

    let start_time = std::time::Instant::now();

    debug!("Incoming request: {} {} from {}", method, uri, client_ip);

    let response = next.run(request).await;

    info!(
        "Request completed: {} {} {} - {}ms",
        method,
        uri,
        response.status().as_u16(),
        start_time.elapsed().as_millis()
    );

    response
}

/// 获取客户端 IP 地址
fn get_client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    // 检查常见的代理头
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip_str) = forwarded_for.to_str() {
            if let Some(ip) = ip_str.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
