//! HTTP 传输能力
//!
//! 路由器不直接依赖 reqwest，而是通过 `HttpTransport` 发送请求，
//! 测试中可替换为计数的假实现。

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;

use super::error_classifier::classify_transport_error;
use crate::core::error::TransportError;

/// 请求选项 (对应 fetch 的 options 参数)
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// 发送请求；只有网络层失败才返回 Err，HTTP 错误码属于正常响应
    async fn send(&self, url: &str, options: &FetchOptions)
        -> Result<FetchResponse, TransportError>;
}

/// 基于 reqwest 的默认传输
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// 不读取环境变量代理，是否走代理只由路由器决定
    pub fn new(request_timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(request_timeout)
            .build()
            .map_err(|e| format!("创建HTTP客户端失败: {}", e))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse, TransportError> {
        let mut request = self
            .client
            .request(options.method.clone(), url)
            .headers(options.headers.clone());

        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify_transport_error)?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
