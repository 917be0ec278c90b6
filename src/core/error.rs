//! 路由层错误类型
//!
//! 本组件中没有任何错误对调用方是致命的：加载失败视为未配置，持久化失败
//! 仍保留内存中的新配置，URL 解析失败拒绝代理，代理请求失败回退直连。

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// 持久化数据损坏或读取失败，按未配置处理
    #[error("加载代理配置失败: {0}")]
    ConfigLoad(String),

    /// 写入存储失败，内存中的配置不回滚
    #[error("保存代理配置失败: {0}")]
    ConfigPersist(String),

    #[error("解析URL失败 ({url}): {reason}")]
    UrlParse { url: String, reason: String },

    /// 经代理的请求失败，已回退直连
    #[error("通过代理请求失败 ({target}): {source}")]
    ProxyFetch {
        target: String,
        #[source]
        source: TransportError,
    },

    /// 直连请求失败 (包括回退请求)
    #[error("请求失败 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl RouterError {
    /// 稳定的错误类别名，供 API 与日志使用
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::ConfigLoad(_) => "config_load",
            RouterError::ConfigPersist(_) => "config_persist",
            RouterError::UrlParse { .. } => "url_parse",
            RouterError::ProxyFetch { .. } => "proxy_fetch",
            RouterError::Transport { .. } => "transport",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Decode,
    Body,
    Request,
    Unknown,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Timeout => "timeout_error",
            TransportErrorKind::Connect => "connection_error",
            TransportErrorKind::Decode => "decode_error",
            TransportErrorKind::Body => "stream_error",
            TransportErrorKind::Request => "request_error",
            TransportErrorKind::Unknown => "unknown_error",
        };
        f.write_str(name)
    }
}

/// 传输层失败 (网络错误，不包括 HTTP 错误状态码)
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
