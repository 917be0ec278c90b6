//! SQLite 键值存储 (configs 表)

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::KvStore;

pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 打开 (必要时创建) 数据库并建表
    pub async fn open(db_path: &Path) -> Result<Self, String> {
        let pool = crate::core::db::init_db(db_path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let row = sqlx::query("SELECT value FROM configs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| format!("Failed to fetch config from DB: {}", e))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        sqlx::query(
            "INSERT INTO configs (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to save config to DB: {}", e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        sqlx::query("DELETE FROM configs WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to delete config from DB: {}", e))?;

        Ok(())
    }
}
