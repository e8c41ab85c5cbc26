use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    services::{
        store::Store,
        AuthService,
        CourseService,
        NotificationHub,
        NotificationService,
        ProgressLedger,
        ResourceService,
        UserService,
    },
    utils::{
        cache::ProgressCache,
        middleware::{build_rate_limiter, KeyedRateLimiter},
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 持久化存储
    pub store: Arc<dyn Store>,

    /// 认证服务
    pub auth_service: AuthService,

    /// 学习进度账本
    pub ledger: ProgressLedger,

    /// 用户服务
    pub user_service: UserService,

    /// 课程服务
    pub course_service: CourseService,

    /// 通知服务
    pub notification_service: Arc<NotificationService>,

    /// 资源库服务
    pub resource_service: ResourceService,

    /// 按客户端 IP 的限流器
    pub rate_limiter: KeyedRateLimiter,
}

impl AppState {
    /// 组装所有服务，需在 tokio 运行时内调用
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let cache = ProgressCache::new(Duration::from_secs(config.progress_cache_ttl));
        let hub = NotificationHub::new(config.notification_channel_capacity);
        let notification_service = Arc::new(NotificationService::new(store.clone(), hub));

        Self {
            auth_service: AuthService::new(&config),
            ledger: ProgressLedger::new(
                store.clone(),
                cache.clone(),
                notification_service.clone(),
                config.max_review_length,
            ),
            user_service: UserService::new(store.clone(), notification_service.clone(), cache.clone()),
            course_service: CourseService::new(
                store.clone(),
                notification_service.clone(),
                cache,
                config.max_post_length,
            ),
            resource_service: ResourceService::new(store.clone()),
            rate_limiter: build_rate_limiter(config.rate_limit_requests),
            notification_service,
            store,
            config,
        }
    }

    /// 检查功能是否启用
    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        match feature {
            "registrations" => self.config.enable_registrations,
            _ => false,
        }
    }
}
