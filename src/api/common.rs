//! API 响应信封与请求日志中间件

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::core::error::RouterError;

/// API 响应包装
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// 路由层错误类别 (`RouterError::kind`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

/// 可以放进响应信封的错误
pub trait ApiError {
    fn message(&self) -> String;

    fn error_kind(&self) -> Option<&'static str> {
        None
    }
}

impl ApiError for String {
    fn message(&self) -> String {
        self.clone()
    }
}

impl ApiError for RouterError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn error_kind(&self) -> Option<&'static str> {
        Some(self.kind())
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn err(error: impl ApiError) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(error.message()),
            error_kind: error.error_kind(),
        })
    }
}

pub fn into_response<T: Serialize, E: ApiError>(result: Result<T, E>) -> Response {
    match result {
        Ok(data) => ApiResponse::ok(data).into_response(),
        Err(e) => ApiResponse::err(e).into_response(),
    }
}

/// 只记录路径，查询串里可能带着目标地址或凭据
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, latency_ms, "API 请求失败");
    } else if path == "/healthz" {
        tracing::trace!(%method, %path, status, latency_ms, "健康检查");
    } else {
        tracing::info!(%method, %path, status, latency_ms, "API 请求");
    }
    response
}
