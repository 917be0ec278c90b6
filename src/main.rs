use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wetools_server::api::{build_routes, common};
use wetools_server::core::StorageConfig;
use wetools_server::proxy::{LoadOutcome, DEFAULT_RELAY_PORT};
use wetools_server::state::{AppSettings, AppState, StorageBackend};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API 监听端口
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// 数据目录 (默认: ~/.wetools/)
    #[arg(short, long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// 内置中继服务器端口
    #[arg(long, env = "RELAY_PORT", default_value_t = DEFAULT_RELAY_PORT)]
    relay_port: u16,

    /// 配置持久化后端
    #[arg(long, value_enum, default_value_t = StorageBackend::Sqlite)]
    storage: StorageBackend,

    /// 请求超时时间(秒)
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let state = AppState::new(AppSettings {
        data_dir: args.data_dir,
        storage: args.storage,
        relay_port: args.relay_port,
        request_timeout: args.request_timeout,
    })
    .await
    .map_err(|e| anyhow::anyhow!("初始化失败: {}", e))?;

    let app_state = Arc::new(state);

    // 加载已保存的代理配置，启用时同时启动中继
    match app_state.bootstrap().await {
        LoadOutcome::Loaded(routing) => {
            tracing::info!("Proxy config loaded on startup, routing {:?}", routing)
        }
        LoadOutcome::Missing => tracing::info!("No saved proxy config, requests go direct"),
        LoadOutcome::Recovered(e) => {
            tracing::warn!("{} (routing disabled until the config is saved again)", e)
        }
    }

    let app = build_routes(app_state.clone())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(common::request_logger));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Data dir: {:?}", app_state.storage.data_dir());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    app_state.relay.stop().await.map_err(anyhow::Error::msg)?;
    Ok(())
}
