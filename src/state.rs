use crate::core::storage::{JsonFileKvStore, KvStore, SqliteKvStore};
use crate::core::traits::{DefaultStorageConfig, StorageConfig};
use crate::proxy::{
    HttpTransport, LoadOutcome, LogStore, ProxyRouter, RelayManager, ReqwestTransport,
    DEFAULT_RELAY_PORT,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 配置持久化后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageBackend {
    /// SQLite configs 表
    #[default]
    Sqlite,
    /// 单个 JSON 文件
    Json,
}

/// 启动参数
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub data_dir: Option<PathBuf>,
    pub storage: StorageBackend,
    pub relay_port: u16,
    /// 请求超时时间(秒)
    pub request_timeout: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage: StorageBackend::default(),
            relay_port: DEFAULT_RELAY_PORT,
            request_timeout: 120,
        }
    }
}

/// Web 应用状态
pub struct AppState {
    pub storage: DefaultStorageConfig,
    pub router: Arc<ProxyRouter>,
    pub relay: RelayManager,
    pub log_store: Arc<LogStore>,
    /// 配置中的中继端口，代理启用时使用
    pub relay_port: AtomicU16,
}

impl AppState {
    pub async fn new(settings: AppSettings) -> Result<Self, String> {
        let storage = match settings.data_dir {
            Some(dir) => DefaultStorageConfig::with_path(dir)?,
            None => DefaultStorageConfig::new()?,
        };

        let store: Arc<dyn KvStore> = match settings.storage {
            StorageBackend::Sqlite => Arc::new(SqliteKvStore::open(&storage.database_path()).await?),
            StorageBackend::Json => Arc::new(JsonFileKvStore::new(storage.settings_path())),
        };

        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(
            settings.request_timeout,
        ))?);

        Ok(Self::from_parts(
            storage,
            store,
            transport,
            settings.relay_port,
        ))
    }

    pub fn from_parts(
        storage: DefaultStorageConfig,
        store: Arc<dyn KvStore>,
        transport: Arc<dyn HttpTransport>,
        relay_port: u16,
    ) -> Self {
        let log_store = Arc::new(LogStore::default());
        let router = Arc::new(ProxyRouter::new(store, transport).with_log_store(log_store.clone()));

        Self {
            storage,
            relay: RelayManager::new(router.clone()),
            router,
            log_store,
            relay_port: AtomicU16::new(relay_port),
        }
    }

    /// 加载已保存的配置，代理已启用则启动中继服务器
    pub async fn bootstrap(&self) -> LoadOutcome {
        let outcome = self.router.load().await;
        let port = self.relay_port.load(Ordering::SeqCst);

        if let Err(e) = self.relay.sync(outcome.routing_state(), port).await {
            tracing::warn!("启动中继服务器失败: {}", e);
        }

        outcome
    }
}
