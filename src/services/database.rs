use crate::config::Config;
use crate::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, error, info};

/// 数据库服务
#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// 根据配置创建数据库连接池并执行迁移
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(&config.database_url, config.database_max_connections).await
    }

    /// 连接指定的数据库地址
    ///
    /// In-memory databases are private to one connection, so the pool is
    /// capped at a single connection for them.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Initializing database connection to {}", database_url);

        let in_memory = database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };

        if !in_memory {
            let filename = options.clone().get_filename();
            if let Some(parent) = filename.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Internal(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            // the database lives only as long as its connection
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match sqlx::query("SELECT 1").execute(self.pool()?).await {
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

    /// 获取可用的连接池；连接池已关闭时返回 InvalidConnection
    pub fn pool(&self) -> Result<&Pool<Sqlite>> {
        if self.pool.is_closed() {
            return Err(AppError::InvalidConnection);
        }
        Ok(&self.pool)
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<()> {
        debug!("Running comment schema migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                language_id INTEGER NOT NULL DEFAULT 0,
                created INTEGER NOT NULL,
                modified INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                session_key TEXT NOT NULL,
                ip TEXT NOT NULL DEFAULT '',
                contentobject_id INTEGER NOT NULL,
                parent_comment_id INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                text TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_comment_content_status
                ON comment(contentobject_id, status, created);
            CREATE INDEX IF NOT EXISTS idx_comment_user_status
                ON comment(user_id, status, created);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_language (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                locale TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
