//! 核心模块
//! 数据模型、错误类型与持久化，不依赖 HTTP 运行时

pub mod db;
pub mod error;
pub mod models;
pub mod storage;
pub mod traits;

// 重导出常用类型
pub use traits::{DefaultStorageConfig, StorageConfig};
