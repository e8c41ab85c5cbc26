use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{info, error, debug};

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub client: Surreal<Any>,
    pub config: Config,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let client = any::connect(config.database_url.as_str()).await?;

        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;

        client
            .use_ns(config.database_namespace.as_str())
            .use_db(config.database_name.as_str())
            .await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.client.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    /// 执行带参数的查询，任一语句失败即返回错误
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        debug!("Executing query: {}", sql);
        let response = self.client.query(sql).bind(params).await?;
        Ok(response.check()?)
    }

    /// 查询并取出第一条语句的结果
    pub async fn fetch_all<T, P>(&self, sql: &str, params: P) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let mut response = self.query_with_params(sql, params).await?;
        let rows: Vec<T> = response.take(0)?;
        Ok(rows)
    }

    /// 查询单条记录
    pub async fn fetch_one<T, P>(&self, sql: &str, params: P) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }
}
