//! WeTools 原生后端
//!
//! 代理路由核心 (`proxy::ProxyRouter`)、配置持久化、内置中继服务器以及
//! 供 GUI 外壳调用的本地 HTTP API。

pub mod api;
pub mod core;
pub mod proxy;
pub mod state;

pub use crate::core::error::{RouterError, TransportError, TransportErrorKind};
pub use crate::core::models::{ProxyConfig, ProxyScheme, RoutingState};
pub use crate::proxy::{FetchOutcome, LoadOutcome, ProxyRouter, Route};
