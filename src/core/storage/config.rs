//! 代理配置存储服务

use super::KvStore;
use crate::core::error::RouterError;
use crate::core::models::ProxyConfig;

/// 前端 localStorage 使用的固定键
pub const PROXY_CONFIG_KEY: &str = "proxyConfig";

/// 代理配置存储服务
pub struct ConfigStorage;

impl ConfigStorage {
    /// 加载代理配置
    ///
    /// 键不存在或存的是 `null` 时返回 `Ok(None)`，数据损坏返回 `ConfigLoad`。
    pub async fn load(store: &dyn KvStore) -> Result<Option<ProxyConfig>, RouterError> {
        let Some(content) = store
            .get(PROXY_CONFIG_KEY)
            .await
            .map_err(RouterError::ConfigLoad)?
        else {
            return Ok(None);
        };

        serde_json::from_str::<Option<ProxyConfig>>(&content)
            .map_err(|e| RouterError::ConfigLoad(format!("解析代理配置失败: {}", e)))
    }

    /// 保存代理配置
    pub async fn save(store: &dyn KvStore, config: &ProxyConfig) -> Result<(), RouterError> {
        let content = serde_json::to_string(config)
            .map_err(|e| RouterError::ConfigPersist(format!("序列化配置失败: {}", e)))?;

        store
            .set(PROXY_CONFIG_KEY, &content)
            .await
            .map_err(RouterError::ConfigPersist)
    }
}
