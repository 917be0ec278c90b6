//! 内置中继服务器
//!
//! 监听 127.0.0.1，把请求转发到目标地址。目标地址来源依次为:
//! 整个路径本身是绝对地址 (路由器拼接的 `{proxy_url}/{target_url}` 形式)、
//! `/proxy/<url>` 路径、或 `/proxy?url=` 查询参数。

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use url::Url;

use super::router::{ProxyRouter, BYPASS_HOSTS};
use crate::core::models::RoutingState;

pub const DEFAULT_RELAY_PORT: u16 = 8081;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// 不转发的请求头 (逐跳头以及可能泄露客户端信息的头)
const STRIPPED_REQUEST_HEADERS: [&str; 12] = [
    "host",
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "x-forwarded-for",
    "x-real-ip",
];

const STRIPPED_RESPONSE_HEADERS: [&str; 6] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "trailer",
    "transfer-encoding",
    "content-length",
];

/// 中继服务状态
#[derive(Debug, Clone, Serialize, Default)]
pub struct RelayStatus {
    pub running: bool,
    pub port: u16,
    pub base_url: String,
}

impl RelayStatus {
    fn running(addr: SocketAddr) -> Self {
        Self {
            running: true,
            port: addr.port(),
            base_url: format!("http://{}", addr),
        }
    }
}

struct RelayInstance {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct RelayState {
    router: Arc<ProxyRouter>,
    local_port: u16,
    /// 不经过任何代理 (本机目标、上游代理指回中继自身)
    no_proxy: reqwest::Client,
    /// 未配置上游代理，遵循环境变量中的代理
    direct: reqwest::Client,
    /// 按上游代理地址缓存，地址变化时重建
    proxied: StdMutex<Option<(String, reqwest::Client)>>,
}

fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT)
}

fn build_failed(e: reqwest::Error) -> String {
    format!("创建HTTP客户端失败: {}", e)
}

impl RelayState {
    fn new(router: Arc<ProxyRouter>, local_port: u16) -> Result<Self, String> {
        Ok(Self {
            router,
            local_port,
            no_proxy: client_builder().no_proxy().build().map_err(build_failed)?,
            direct: client_builder().build().map_err(build_failed)?,
            proxied: StdMutex::new(None),
        })
    }

    fn client_for(&self, target: &Url) -> Result<reqwest::Client, String> {
        // 本机地址从不经过代理 (包括环境变量中的代理)
        if target.host_str().is_some_and(|h| BYPASS_HOSTS.contains(&h)) {
            return Ok(self.no_proxy.clone());
        }

        let Some(proxy_url) = self.router.build_proxy_url() else {
            return Ok(self.direct.clone());
        };

        if points_at_relay(&proxy_url, self.local_port) {
            tracing::warn!("上游代理指向中继自身，忽略上游代理");
            return Ok(self.no_proxy.clone());
        }

        let mut cached = self.proxied.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((url, client)) = cached.as_ref() {
            if *url == proxy_url {
                return Ok(client.clone());
            }
        }

        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| format!("无效的代理地址: {}", e))?;
        let client = client_builder().proxy(proxy).build().map_err(build_failed)?;
        tracing::debug!("上游代理变更，重建中继客户端");
        *cached = Some((proxy_url, client.clone()));
        Ok(client)
    }
}

/// 中继服务管理器
pub struct RelayManager {
    router: Arc<ProxyRouter>,
    instance: Mutex<Option<RelayInstance>>,
}

impl RelayManager {
    pub fn new(router: Arc<ProxyRouter>) -> Self {
        Self {
            router,
            instance: Mutex::new(None),
        }
    }

    /// 启动中继服务，port 为 0 时由系统分配；已运行时直接返回当前状态
    pub async fn start(&self, port: u16) -> Result<RelayStatus, String> {
        let mut instance_lock = self.instance.lock().await;

        if let Some(instance) = instance_lock.as_ref() {
            return Ok(RelayStatus::running(instance.addr));
        }

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .map_err(|e| format!("绑定端口失败: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| format!("获取监听地址失败: {}", e))?;

        let app = relay_routes(Arc::new(RelayState::new(
            self.router.clone(),
            addr.port(),
        )?));

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::error!("中继服务器错误: {}", e);
            }
        });

        tracing::info!("中继服务器已在 {} 上启动", addr);
        *instance_lock = Some(RelayInstance {
            addr,
            shutdown,
            handle,
        });

        Ok(RelayStatus::running(addr))
    }

    /// 停止中继服务，未运行时什么也不做
    pub async fn stop(&self) -> Result<(), String> {
        let Some(instance) = self.instance.lock().await.take() else {
            return Ok(());
        };

        let _ = instance.shutdown.send(());
        let mut handle = instance.handle;
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle)
            .await
            .is_err()
        {
            tracing::warn!("中继服务器关闭超时，强制终止");
            handle.abort();
        }

        tracing::info!("中继服务器已停止 ({})", instance.addr);
        Ok(())
    }

    pub async fn status(&self) -> RelayStatus {
        match self.instance.lock().await.as_ref() {
            Some(instance) => RelayStatus::running(instance.addr),
            None => RelayStatus::default(),
        }
    }

    /// 代理启用时确保中继运行，禁用时停止
    pub async fn sync(&self, state: RoutingState, port: u16) -> Result<RelayStatus, String> {
        match state {
            RoutingState::Enabled => self.start(port).await,
            RoutingState::Disabled => {
                self.stop().await?;
                Ok(RelayStatus::default())
            }
        }
    }

    /// 经中继访问目标的地址
    pub async fn relay_url(&self, target_url: &str) -> Result<String, String> {
        let status = self.status().await;
        if !status.running {
            return Err("中继服务器未启动".to_string());
        }

        let encoded: String = url::form_urlencoded::byte_serialize(target_url.as_bytes()).collect();
        Ok(format!("{}/proxy?url={}", status.base_url, encoded))
    }
}

fn relay_routes(state: Arc<RelayState>) -> Router {
    Router::new().fallback(relay_handler).with_state(state)
}

/// 从请求中提取目标地址
///
/// 路径本身是绝对地址时整个路径加查询串都属于目标，
/// `url=` 查询参数只在 `/` 和 `/proxy` 上生效。
fn extract_target(uri: &Uri) -> Option<String> {
    let path = uri.path();
    let rest = path.strip_prefix('/')?;

    if rest.starts_with("http://") || rest.starts_with("https://") {
        let mut target = rest.to_string();
        if let Some(query) = uri.query() {
            target.push('?');
            target.push_str(query);
        }
        return Some(target);
    }

    if let Some(encoded) = rest.strip_prefix("proxy/") {
        if !encoded.is_empty() {
            return Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
        }
    }

    if !matches!(rest, "" | "proxy" | "proxy/") {
        return None;
    }

    url::form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn is_stripped(name: &HeaderName, list: &[&str]) -> bool {
    list.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// 上游代理指回中继自身时会形成环路
fn points_at_relay(proxy_url: &str, local_port: u16) -> bool {
    Url::parse(proxy_url)
        .map(|url| {
            url.host_str().is_some_and(|h| BYPASS_HOSTS.contains(&h))
                && url.port_or_known_default() == Some(local_port)
        })
        .unwrap_or(false)
}

async fn relay_handler(State(state): State<Arc<RelayState>>, req: Request) -> Response {
    let Some(target) = extract_target(req.uri()) else {
        return (StatusCode::BAD_REQUEST, "缺少目标URL").into_response();
    };

    let target = match Url::parse(&target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("不支持的协议: {}", url.scheme()),
            )
                .into_response()
        }
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("无效的目标URL: {}", e)).into_response()
        }
    };

    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("读取请求体失败: {}", e)).into_response()
        }
    };

    let client = match state.client_for(&target) {
        Ok(client) => client,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e).into_response(),
    };

    let mut headers = HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if !is_stripped(name, &STRIPPED_REQUEST_HEADERS) {
            headers.append(name.clone(), value.clone());
        }
    }

    let mut request = client
        .request(parts.method.clone(), target.as_str())
        .headers(headers);
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!("中继请求失败 {} {}: {}", parts.method, target, e);
            return (StatusCode::BAD_GATEWAY, format!("请求失败: {}", e)).into_response();
        }
    };

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers().iter() {
        if !is_stripped(name, &STRIPPED_RESPONSE_HEADERS) {
            response_headers.append(name.clone(), value.clone());
        }
    }

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("读取上游响应失败: {}", e);
            return (StatusCode::BAD_GATEWAY, format!("读取响应失败: {}", e)).into_response();
        }
    };

    tracing::debug!("{} {} -> {}", parts.method, target, status);

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}
