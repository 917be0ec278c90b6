//! 核心数据模型

mod proxy_config;

pub use proxy_config::{ProxyConfig, ProxyScheme, RoutingState};
