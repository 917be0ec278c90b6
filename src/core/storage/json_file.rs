//! JSON 文件键值存储
//! 所有键存放在同一个 JSON 对象文件中

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::KvStore;

pub struct JsonFileKvStore {
    path: PathBuf,
    // 串行化读-改-写
    write_lock: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在或为空时返回 None
    async fn read_content(&self) -> Result<Option<String>, String> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("读取配置文件失败: {}", e))?;

        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    async fn read_all(&self) -> Result<Map<String, Value>, String> {
        match self.read_content().await? {
            Some(content) => {
                serde_json::from_str(&content).map_err(|e| format!("解析配置文件失败: {}", e))
            }
            None => Ok(Map::new()),
        }
    }

    /// 写入前读取；文件损坏时备份后从空对象开始，保证之后的写入能修复它
    async fn read_for_update(&self) -> Result<Map<String, Value>, String> {
        let Some(content) = self.read_content().await? else {
            return Ok(Map::new());
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let backup = self.path.with_extension("json.corrupt");
                tracing::warn!("配置文件损坏，将重新写入: {} (备份: {:?})", e, backup);
                if let Err(e) = fs::copy(&self.path, &backup).await {
                    tracing::warn!("备份损坏的配置文件失败: {}", e);
                }
                Ok(Map::new())
            }
        }
    }

    async fn write_all(&self, entries: &Map<String, Value>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("创建配置目录失败: {}", e))?;
        }

        let content =
            serde_json::to_string_pretty(entries).map_err(|e| format!("序列化配置失败: {}", e))?;

        // 原子写入：先写入临时文件，再重命名
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| format!("写入临时配置文件失败: {}", e))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| format!("重命名配置文件失败: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self.read_all().await?;
        Ok(entries.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_for_update().await?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_for_update().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}
