use axum::{
    extract::{Json, Query, State},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::common::{into_response, ApiResponse};
use crate::proxy::{FetchLogEntry, FetchOptions, Route, DEFAULT_TEST_URL};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RouteRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct RouteView {
    pub url: String,
    pub should_route: bool,
    pub proxied_target: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
}

#[derive(Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[derive(Serialize)]
pub struct FetchView {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub route: Route,
    pub target: String,
    pub fallback_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct TestQuery {
    pub url: Option<String>,
}

#[derive(Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// 只看某种路由结果: direct / proxied / fallback
    pub route: Option<Route>,
}

#[derive(Serialize)]
pub struct LogPage {
    pub logs: Vec<FetchLogEntry>,
    /// 过滤后的总数
    pub total: usize,
}

pub async fn get_proxy_url(State(state): State<Arc<AppState>>) -> Response {
    ApiResponse::ok(state.router.build_proxy_url()).into_response()
}

pub async fn check_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RouteRequest>,
) -> Response {
    let view = match state.router.resolve_route(&req.url) {
        Ok(proxied_target) => RouteView {
            should_route: proxied_target.is_some(),
            proxied_target,
            error: None,
            error_kind: None,
            url: req.url,
        },
        Err(e) => RouteView {
            should_route: false,
            proxied_target: None,
            error: Some(e.to_string()),
            error_kind: Some(e.kind()),
            url: req.url,
        },
    };

    ApiResponse::ok(view).into_response()
}

fn build_options(req: &FetchRequest) -> Result<FetchOptions, String> {
    let method = match req.method.as_deref() {
        Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
            .map_err(|e| format!("无效的请求方法 {}: {}", m, e))?,
        None => Method::GET,
    };

    let mut headers = HeaderMap::new();
    for (name, value) in &req.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("无效的请求头 {}: {}", name, e))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("无效的请求头值 {}: {}", name, e))?;
        headers.insert(name, value);
    }

    Ok(FetchOptions {
        method,
        headers,
        body: req.body.clone().map(Bytes::from),
    })
}

pub async fn fetch(State(state): State<Arc<AppState>>, Json(req): Json<FetchRequest>) -> Response {
    let options = match build_options(&req) {
        Ok(options) => options,
        Err(e) => return ApiResponse::err(e).into_response(),
    };

    let result = state
        .router
        .fetch(&req.url, &options)
        .await
        .map(|outcome| FetchView {
            status: outcome.response.status,
            headers: outcome
                .response
                .headers
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: outcome.response.text(),
            fallback_reason: outcome.proxy_error.as_ref().map(|e| e.to_string()),
            route: outcome.route,
            target: outcome.target,
        });

    into_response(result)
}

pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TestQuery>,
) -> Response {
    let url = query.url.as_deref().unwrap_or(DEFAULT_TEST_URL);
    ApiResponse::ok(state.router.test_connection(url).await).into_response()
}

pub async fn get_fetch_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Response {
    let (logs, total) = state.log_store.query(
        query.route,
        query.limit.unwrap_or(100),
        query.offset.unwrap_or(0),
    );
    ApiResponse::ok(LogPage { logs, total }).into_response()
}

pub async fn clear_fetch_logs(State(state): State<Arc<AppState>>) -> Response {
    state.log_store.clear();
    ApiResponse::ok(()).into_response()
}
