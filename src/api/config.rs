use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::common::ApiResponse;
use crate::core::models::{ProxyConfig, RoutingState};
use crate::proxy::{LoadOutcome, RelayStatus};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConfigView {
    pub config: Option<ProxyConfig>,
    pub state: RoutingState,
}

#[derive(Serialize)]
pub struct UpdateResult {
    pub state: RoutingState,
    /// 写入存储是否成功；失败时新配置仍已生效
    pub persisted: bool,
    pub warning: Option<String>,
    pub relay: RelayStatus,
}

#[derive(Serialize)]
pub struct ReloadResult {
    pub state: RoutingState,
    pub status: &'static str,
    pub error: Option<String>,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Response {
    ApiResponse::ok(ConfigView {
        config: state.router.config(),
        state: state.router.state(),
    })
    .into_response()
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ProxyConfig>,
) -> Response {
    let (routing, persisted, warning) = match state.router.update(config).await {
        Ok(routing) => (routing, true, None),
        Err(e) => (state.router.state(), false, Some(e.to_string())),
    };

    // 启用时启动中继，禁用时停止
    let port = state.relay_port.load(Ordering::SeqCst);
    let relay = match state.relay.sync(routing, port).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("同步中继服务器状态失败: {}", e);
            state.relay.status().await
        }
    };

    ApiResponse::ok(UpdateResult {
        state: routing,
        persisted,
        warning,
        relay,
    })
    .into_response()
}

pub async fn reload_config(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.router.load().await;
    let result = match &outcome {
        LoadOutcome::Loaded(routing) => ReloadResult {
            state: *routing,
            status: "loaded",
            error: None,
        },
        LoadOutcome::Missing => ReloadResult {
            state: RoutingState::Disabled,
            status: "missing",
            error: None,
        },
        LoadOutcome::Recovered(e) => ReloadResult {
            state: RoutingState::Disabled,
            status: "recovered",
            error: Some(e.to_string()),
        },
    };

    ApiResponse::ok(result).into_response()
}
