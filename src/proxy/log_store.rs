//! 请求日志存储
//! 使用内存环形缓冲区记录每次 fetch 的路由结果

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::router::Route;

/// 请求日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub method: String,
    pub url: String,
    pub route: Route,
    /// 实际请求的地址 (代理时为拼接后的地址)
    pub target: String,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// 待记录的请求信息
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub method: String,
    pub url: String,
    pub route: Route,
    pub target: String,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// 日志存储（环形缓冲区）
pub struct LogStore {
    logs: RwLock<VecDeque<FetchLogEntry>>,
    max_size: usize,
    next_id: AtomicU64,
}

impl LogStore {
    /// 创建新的日志存储
    pub fn new(max_size: usize) -> Self {
        Self {
            logs: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<FetchLogEntry>> {
        self.logs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<FetchLogEntry>> {
        self.logs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 记录一条日志
    pub fn record(&self, record: FetchRecord) {
        if self.max_size == 0 {
            return;
        }

        let entry = FetchLogEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            timestamp: chrono::Utc::now().timestamp_millis(),
            method: record.method,
            url: record.url,
            route: record.route,
            target: record.target,
            status_code: record.status_code,
            latency_ms: record.latency_ms,
            error: record.error,
        };

        let mut logs = self.write();

        // 如果超过最大容量，移除最旧的
        if logs.len() >= self.max_size {
            logs.pop_front();
        }

        logs.push_back(entry);
    }

    /// 获取日志（最新的在前，支持分页）
    pub fn get_logs(&self, limit: usize, offset: usize) -> Vec<FetchLogEntry> {
        self.query(None, limit, offset).0
    }

    /// 按路由过滤后分页，同时返回过滤后的总数
    pub fn query(
        &self,
        route: Option<Route>,
        limit: usize,
        offset: usize,
    ) -> (Vec<FetchLogEntry>, usize) {
        let logs = self.read();
        let matches = |entry: &&FetchLogEntry| route.map_or(true, |r| entry.route == r);

        let total = logs.iter().filter(matches).count();
        let page = logs
            .iter()
            .rev()
            .filter(matches)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }

    /// 获取日志总数
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 清除所有日志
    pub fn clear(&self) {
        self.write().clear();
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(1000) // 默认保留 1000 条
    }
}
