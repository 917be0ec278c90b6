use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod common;
mod config;
mod proxy;
mod relay;

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Config
        .route(
            "/api/proxy/config",
            get(config::get_config).put(config::update_config),
        )
        .route("/api/proxy/reload", post(config::reload_config))
        // Routing
        .route("/api/proxy/url", get(proxy::get_proxy_url))
        .route("/api/proxy/route", post(proxy::check_route))
        .route("/api/proxy/fetch", post(proxy::fetch))
        .route("/api/proxy/test", post(proxy::test_connection))
        // Logs
        .route("/api/proxy/logs", get(proxy::get_fetch_logs))
        .route("/api/proxy/logs/clear", post(proxy::clear_fetch_logs))
        // Relay
        .route("/api/relay/start", post(relay::start_relay))
        .route("/api/relay/stop", post(relay::stop_relay))
        .route("/api/relay/status", get(relay::get_relay_status))
        .route("/api/relay/url", get(relay::get_relay_url))
        // Health
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
