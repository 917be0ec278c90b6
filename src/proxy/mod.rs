// proxy 模块 - 代理路由与内置中继

pub mod error_classifier;
pub mod log_store;
pub mod relay;
pub mod router;
pub mod transport;

pub use log_store::{FetchLogEntry, LogStore};
pub use relay::{RelayManager, RelayStatus, DEFAULT_RELAY_PORT};
pub use router::{FetchOutcome, LoadOutcome, ProbeResult, ProxyRouter, Route, DEFAULT_TEST_URL};
pub use transport::{FetchOptions, FetchResponse, HttpTransport, ReqwestTransport};
