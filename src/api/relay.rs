use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::common::{into_response, ApiResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartRelayQuery {
    pub port: Option<u16>,
}

#[derive(Deserialize)]
pub struct RelayUrlQuery {
    pub target: String,
}

pub async fn start_relay(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StartRelayQuery>,
) -> Response {
    if let Some(port) = query.port {
        state.relay_port.store(port, Ordering::SeqCst);
    }
    let port = state.relay_port.load(Ordering::SeqCst);

    into_response(state.relay.start(port).await)
}

pub async fn stop_relay(State(state): State<Arc<AppState>>) -> Response {
    match state.relay.stop().await {
        Ok(()) => ApiResponse::ok("Relay stopped").into_response(),
        Err(e) => ApiResponse::err(e).into_response(),
    }
}

pub async fn get_relay_status(State(state): State<Arc<AppState>>) -> Response {
    ApiResponse::ok(state.relay.status().await).into_response()
}

pub async fn get_relay_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelayUrlQuery>,
) -> Response {
    into_response(state.relay.relay_url(&query.target).await)
}
