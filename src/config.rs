use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Authentication configuration
    pub jwt_secret: String,

    // Ledger settings
    pub progress_cache_ttl: u64,
    pub notification_channel_capacity: usize,

    // Content settings
    pub max_review_length: usize,
    pub max_post_length: usize,

    // Feature flags
    pub enable_registrations: bool,

    // Rate limiting
    pub rate_limit_requests: u32,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "rainbow_learn=debug,tower_http=debug".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "rainbow".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "learn".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,

            progress_cache_ttl: env::var("PROGRESS_CACHE_TTL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            notification_channel_capacity: env::var("NOTIFICATION_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()?,

            max_review_length: env::var("MAX_REVIEW_LENGTH")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            max_post_length: env::var("MAX_POST_LENGTH")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,

            enable_registrations: env::var("ENABLE_REGISTRATIONS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// `mem://` 表示使用进程内存储（开发和测试环境）
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("mem://")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "rainbow_learn=debug,tower_http=debug".to_string(),
            database_url: "mem://".to_string(),
            database_namespace: "rainbow".to_string(),
            database_name: "learn".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            jwt_secret: "development-secret".to_string(),
            progress_cache_ttl: 300,
            notification_channel_capacity: 1024,
            max_review_length: 2000,
            max_post_length: 5000,
            enable_registrations: true,
            rate_limit_requests: 120,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}
