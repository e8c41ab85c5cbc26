use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rainbow_learn::{
    config::Config,
    models::user::{User, UserRole},
    routes,
    services::{
        store::{MemoryStore, Store, SurrealStore},
        Database,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rainbow-Learn service...");

    let store: Arc<dyn Store> = if config.uses_memory_store() {
        warn!("DATABASE_URL is mem://, using the in-memory store; data will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        // 初始化数据库连接
        let db = match Database::new(&config).await {
            Ok(db) => db,
            Err(e) => {
                error!("Failed to create database connection: {}", e);
                return Err(anyhow::anyhow!("Database initialization failed"));
            }
        };
        db.verify_connection().await?;
        info!("Database connection established successfully");
        Arc::new(SurrealStore::new(Arc::new(db)))
    };

    let app_state = Arc::new(AppState::new(config.clone(), store));

    if config.uses_memory_store() && config.is_development() {
        seed_development_admin(&app_state).await?;
    }

    let app = routes::build_router(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

/// 内存存储启动时为空，开发环境下预置一个管理员并打印其令牌
async fn seed_development_admin(app_state: &AppState) -> anyhow::Result<()> {
    let mut admin = User::registered("admin", "Administrator", "admin@localhost");
    admin.role = UserRole::Admin;
    admin.approved = true;
    app_state.store.insert_user(&admin).await?;

    let token = app_state
        .auth_service
        .issue_token(&admin.id, Some(&admin.email), chrono::Duration::days(1))?;
    info!("Development admin token (valid 24h): {}", token);
    Ok(())
}
