//! 持久化层
//!
//! `KvStore` 对应前端 localStorage 的语义：按字符串键读写字符串值。

mod config;
mod json_file;
mod sqlite;

pub use config::{ConfigStorage, PROXY_CONFIG_KEY};
pub use json_file::JsonFileKvStore;
pub use sqlite::SqliteKvStore;

use async_trait::async_trait;
use dashmap::DashMap;

/// 异步键值存储
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, String>;

    async fn set(&self, key: &str, value: &str) -> Result<(), String>;

    async fn remove(&self, key: &str) -> Result<(), String>;
}

/// 内存键值存储 (测试与临时会话)
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        self.entries.remove(key);
        Ok(())
    }
}
